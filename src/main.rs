fn main() {
    if let Err(err) = bookrec::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
