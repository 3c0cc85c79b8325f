fn main() {
    if let Err(err) = sheets_catalog::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
