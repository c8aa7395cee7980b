fn main() {
    if let Err(err) = chatmark::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
