use std::io::Write;

pub fn read_input(label: &str) -> String {
    print!("{label}: ");
    let _ = std::io::stdout().flush();
    let mut value = String::new();
    let _ = std::io::stdin().read_line(&mut value);
    value.trim().to_string()
}

pub fn read_input_hidden(label: &str) -> String {
    rpassword::prompt_password(format!("{label}: ")).unwrap_or_default()
}
