use gguf_metadata::{GGUFValueType, fixed_width, min_encoded_size};

pub async fn execute() -> anyhow::Result<()> {
    println!("{:>4}  {:<8} {:<6} {:<14} {}", "Code", "Type", "Width", "Interpretation", "Min bytes");
    println!("{}", "-".repeat(48));
    for tag in GGUFValueType::ALL {
        let (width, interp) = match fixed_width(tag) {
            Ok(spec) => (spec.width.to_string(), format!("{:?}", spec.interpretation).to_lowercase()),
            Err(_) => ("var".to_string(), "-".to_string()),
        };
        println!(
            "{:>4}  {:<8} {:<6} {:<14} {}",
            tag.code(),
            tag.name(),
            width,
            interp,
            min_encoded_size(tag)
        );
    }
    Ok(())
}
