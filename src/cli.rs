// ============================================================================
// dotboard CLI — headless batch conversion and export
// ============================================================================
//
// Usage examples:
//   dotboard --input logo.png --output board.pixelart
//   dotboard -i art.pixelart -o board.svg              (format inferred from ext)
//   dotboard -i "shots/*.jpg" --output-dir boards/ --format pixelart
//   dotboard -i project.ltjproj --output top.png
//
// No window is ever opened. Image inputs are quantized onto the grid;
// project inputs are re-exported.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::editor::{Editor, Mode};
use crate::io;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// dotboard headless converter.
///
/// Quantize images onto the dot grid and export projects to PNG/SVG — no GUI
/// required.
#[derive(Parser, Debug)]
#[command(
    name = "dotboard",
    about = "dotboard headless batch converter",
    long_about = "Convert images into dot-grid projects and export projects to\n\
                  PNG or SVG without opening the editor. Project inputs\n\
                  (.pixelart / .ltjproj) are loaded as-is; image inputs are\n\
                  palette-quantized onto the grid first.\n\n\
                  Example:\n  \
                  dotboard --input logo.png --output board.pixelart\n  \
                  dotboard -i \"*.pixelart\" --output-dir out/ --format svg"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "art/*.pixelart").
    /// Project files load as-is; images are quantized onto the grid.
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's
    /// extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, svg, pixelart.
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Viewport width in cells for image imports.
    #[arg(long, default_value_t = 51, value_name = "CELLS")]
    pub grid_width: u32,

    /// Viewport height in cells for image imports.
    #[arg(long, default_value_t = 26, value_name = "CELLS")]
    pub grid_height: u32,

    /// Import scale factor (1.0 = fit the viewport).
    #[arg(long, default_value_t = 1.0, value_name = "FACTOR")]
    pub scale: f64,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Supported output targets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExportFormat {
    Png,
    Svg,
    Pixelart,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Pixelart => "pixelart",
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let format = parse_format(args.format.as_deref(), args.output.as_deref());
    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        match run_one(input_path, &output_path, format, &args) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn is_project_extension(ext: &str) -> bool {
    matches!(ext, "pixelart" | "ltjproj")
}

fn run_one(
    input: &Path,
    output: &Path,
    format: ExportFormat,
    args: &CliArgs,
) -> Result<(), String> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // -- Step 1: Load ----------------------------------------------------
    let mut editor = Editor::new();
    if is_project_extension(&ext) {
        let value = io::load_project(input).map_err(|e| format!("load failed: {}", e))?;
        io::apply_project(&mut editor, value).map_err(|e| format!("load failed: {}", e))?;
    } else {
        let img = io::load_image(input)?;
        editor
            .set_grid_size(args.grid_width, args.grid_height)
            .map_err(|e| format!("bad grid size: {}", e))?;
        editor.import_image(&img, args.scale);
    }

    // -- Step 2: Export --------------------------------------------------
    match format {
        ExportFormat::Pixelart => {
            io::save_project(&editor, output).map_err(|e| format!("save failed: {}", e))?;
        }
        ExportFormat::Png => {
            let img = match editor.mode {
                Mode::Grid => io::render_grid_png(&editor.state.board, &editor.state.viewport)?,
                Mode::Layout => io::render_layout_png(
                    &editor.state.circles,
                    editor.state.board_width_mm(),
                    editor.state.board_height_mm(),
                    editor.settings.circle_diameter_mm(),
                )?,
            };
            io::write_png(&img, output)?;
        }
        ExportFormat::Svg => {
            let svg = match editor.mode {
                Mode::Grid => io::render_grid_svg(&editor.state.board, &editor.state.viewport)?,
                Mode::Layout => io::render_layout_svg(
                    &editor.state.circles,
                    editor.state.board_width_mm(),
                    editor.state.board_height_mm(),
                    editor.settings.circle_diameter_mm(),
                )?,
            };
            std::fs::write(output, svg)
                .map_err(|e| format!("could not write {}: {}", output.display(), e))?;
        }
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`ExportFormat`] from the `--format` string or infer it from
/// the output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> ExportFormat {
    if let Some(f) = format_arg {
        return match f.to_lowercase().as_str() {
            "svg" => ExportFormat::Svg,
            "pixelart" | "project" => ExportFormat::Pixelart,
            _ => ExportFormat::Png,
        };
    }

    if let Some(out) = output {
        return match out
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "svg" => ExportFormat::Svg,
            "pixelart" | "ltjproj" => ExportFormat::Pixelart,
            _ => ExportFormat::Png,
        };
    }

    ExportFormat::Png
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to the stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_inference() {
        assert_eq!(parse_format(Some("SVG"), None), ExportFormat::Svg);
        assert_eq!(parse_format(Some("pixelart"), None), ExportFormat::Pixelart);
        assert_eq!(parse_format(Some("unknown"), None), ExportFormat::Png);
        assert_eq!(
            parse_format(None, Some(Path::new("out/board.svg"))),
            ExportFormat::Svg
        );
        assert_eq!(
            parse_format(None, Some(Path::new("a.ltjproj"))),
            ExportFormat::Pixelart
        );
        assert_eq!(parse_format(None, None), ExportFormat::Png);
    }

    #[test]
    fn test_output_path_avoids_clobbering_input() {
        let path = build_output_path(
            Path::new("art/board.pixelart"),
            None,
            None,
            ExportFormat::Pixelart,
        )
        .unwrap();
        assert_eq!(path, Path::new("art/board_out.pixelart"));

        let path =
            build_output_path(Path::new("art/board.pixelart"), None, None, ExportFormat::Svg)
                .unwrap();
        assert_eq!(path, Path::new("art/board.svg"));
    }

    #[test]
    fn test_output_dir_uses_input_stem() {
        let path = build_output_path(
            Path::new("shots/logo.png"),
            None,
            Some(Path::new("out")),
            ExportFormat::Pixelart,
        )
        .unwrap();
        assert_eq!(path, Path::new("out/logo.pixelart"));
    }
}
