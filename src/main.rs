fn main() {
    if let Err(err) = btrmirror::cli::run() {
        println!("{:#}", err);
        std::process::exit(1);
    }
}
