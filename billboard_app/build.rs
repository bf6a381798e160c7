// build.rs
// Compiles the scene's GLSL shaders to SPIR-V under target/shaders

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_DIR: &str = "resources/shaders";
const TARGET_DIR: &str = "../target/shaders";

fn glslc_path() -> Option<String> {
    match env::var("VULKAN_SDK") {
        Ok(sdk) if cfg!(target_os = "windows") => Some(format!("{}\\Bin\\glslc.exe", sdk)),
        Ok(sdk) => Some(format!("{}/bin/glslc", sdk)),
        Err(_) => {
            eprintln!("warning: VULKAN_SDK not set, shader compilation skipped");
            eprintln!("hint: Install Vulkan SDK and set VULKAN_SDK environment variable");
            None
        }
    }
}

fn is_shader_source(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("vert" | "frag")
    )
}

fn needs_compile(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(src), Some(dst)) => src > dst,
        _ => true,
    }
}

fn main() {
    println!("cargo:rerun-if-changed={}", SHADER_DIR);
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var("SKIP_SHADERS").is_ok() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Some(glslc) = glslc_path() else {
        return;
    };
    if !Path::new(&glslc).exists() {
        eprintln!("error: glslc not found at: {}", glslc);
        panic!("Shader compiler not found");
    }

    let target_dir = PathBuf::from(TARGET_DIR);
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: Failed to create target directory: {}", e);
        return;
    }

    let entries = match std::fs::read_dir(SHADER_DIR) {
        Ok(entries) => entries,
        Err(_) => {
            eprintln!("info: No shader directory found at: {}", SHADER_DIR);
            return;
        }
    };

    let mut compiled = 0;
    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        if !is_shader_source(&path) {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        let output = target_dir.join(stem).with_extension("spv");
        if !needs_compile(&path, &output) {
            continue;
        }

        let status = Command::new(&glslc).arg(&path).arg("-o").arg(&output).status();
        match status {
            Ok(s) if s.success() => {
                eprintln!("info: Compiled {} -> {}", path.display(), output.display());
                compiled += 1;
            }
            Ok(s) => {
                eprintln!("error: glslc failed for {} with exit code: {}", path.display(), s.code().unwrap_or(-1));
                panic!("Shader compilation failed");
            }
            Err(e) => {
                eprintln!("error: Failed to run glslc: {}", e);
                panic!("Failed to execute shader compiler");
            }
        }
    }

    if compiled > 0 {
        eprintln!("info: Compiled {} shader(s)", compiled);
    }
}
