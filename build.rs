use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../config.template.toml");
    
    let template = r#"# VDKIO Configuration Template
# Copy this file to 'config.toml' and fill in your actual values

pacing_advance_ms = 20
lookahead_depth = 2
max_pes_payload = 204800
max_input_bytes = 1073741824
"#;
    
    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
