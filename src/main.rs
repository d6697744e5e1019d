fn main() {
    if let Err(e) = slotbook_lib::run() {
        eprintln!("slotbook: {e}");
        std::process::exit(1);
    }
}
