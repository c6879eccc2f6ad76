fn main() -> Result<(), Box<dyn std::error::Error>> {
    testscope_cli::run()
}
