fn main() {
    bathy_tools::cli::run();
}
