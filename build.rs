fn main() {
    let now = time::OffsetDateTime::now_utc();
    let format = |spec: &str| {
        time::format_description::parse(spec)
            .ok()
            .and_then(|fmt| now.format(&fmt).ok())
            .unwrap_or_else(|| "unknown".to_string())
    };

    let date = std::env::var("MSH_BUILD_DATE")
        .unwrap_or_else(|_| format("[month repr:short] [day padding:space] [year]"));
    let time = std::env::var("MSH_BUILD_TIME")
        .unwrap_or_else(|_| format("[hour]:[minute]:[second]"));

    println!("cargo:rustc-env=MSH_BUILD_DATE={}", date);
    println!("cargo:rustc-env=MSH_BUILD_TIME={}", time);
    println!("cargo:rerun-if-env-changed=MSH_BUILD_DATE");
    println!("cargo:rerun-if-env-changed=MSH_BUILD_TIME");
}
