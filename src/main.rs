fn main() {
    if let Err(error) = nai_prompt_studio_lib::run() {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}
