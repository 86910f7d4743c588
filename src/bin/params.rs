use seedmap::config::Config;

fn main() {
    let json = serde_json::to_string_pretty(&Config::default())
        .expect("config serializes to json");
    println!("{json}");
}
