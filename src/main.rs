fn main() {
    if let Err(err) = tabmap::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
