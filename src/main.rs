fn main() {
    if let Err(err) = tv_qa_panel_lib::run() {
        eprintln!("[{}] {}", err.code, err.error);
        std::process::exit(1);
    }
}
