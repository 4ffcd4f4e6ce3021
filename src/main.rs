fn main() {
    std::process::exit(cachey::cli::run());
}
