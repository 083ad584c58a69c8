// ============================================================================
// MemeFE CLI — render captioned memes from the command line
// ============================================================================
//
// Usage examples:
//   memefe -i cat.jpg -c "WHEN THE CODE FINALLY WORKS"
//   memefe -i cat.jpg --captions-file captions.json --pick 3 -o out.png
//   memefe -i cat.jpg --captions-file captions.json --all --output-dir memes/
//   memefe -i "shots/*.png" -c "MONDAY" --output-dir memes/
//   memefe --paste -c "NO" --copy
//   memefe --template drake
//
// All rendering is CPU-only; decoding runs on a rayon worker and `--all`
// renders every caption candidate in parallel, one surface each.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;

use clap::Parser;
use rayon::prelude::*;

use crate::canvas::CanvasSurface;
use crate::captions::{CaptionSupplier, JsonCaptionFile, StaticCaptions};
use crate::io::{ClipboardImageSource, ClipboardSink, ExportSink, FileImageSource, ImageSource, PngFileSink};
use crate::ops::compositor::{Compositor, MAX_STROKE_WIDTH};
use crate::ops::text::{FontFace, resolve_face};
use crate::ops::transform::Interpolation;
use crate::session::MemeSession;
use crate::settings::MemeSettings;
use crate::templates::{MEME_TEMPLATES, find_template};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// MemeFE meme compositor.
///
/// Fits an image into a fixed canvas and draws an outlined, auto-sized caption on top.
#[derive(Parser, Debug)]
#[command(
    name = "memefe",
    about = "MemeFE headless meme compositor",
    long_about = "Fit an image (PNG, JPEG or WEBP) into a fixed canvas and draw an\n\
                  outlined caption that shrinks until it fits the image width.\n\n\
                  Example:\n  \
                  memefe -i cat.jpg -c \"WHEN THE CODE FINALLY WORKS\"\n  \
                  memefe -i cat.jpg --captions-file captions.json --all --output-dir memes/"
)]
pub struct CliArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(
        short,
        long,
        num_args = 1..,
        required_unless_present_any = ["paste", "list_templates", "template", "save_settings"]
    )]
    pub input: Vec<String>,

    /// Take the source image from the system clipboard.
    #[arg(long, conflicts_with = "input")]
    pub paste: bool,

    /// Caption candidate. Repeat for several candidates.
    #[arg(short, long, value_name = "TEXT")]
    pub caption: Vec<String>,

    /// Caption generator response: a JSON object {"captions": [...]}.
    #[arg(long, value_name = "FILE.json", conflicts_with = "caption")]
    pub captions_file: Option<PathBuf>,

    /// Which caption candidate to draw (1-based).
    #[arg(short, long, default_value_t = 1, value_name = "N")]
    pub pick: usize,

    /// Render every caption candidate to its own numbered file.
    #[arg(long, conflicts_with = "pick")]
    pub all: bool,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Copy the rendered meme to the system clipboard. No file is written
    /// unless --output or --output-dir is also given.
    #[arg(long, conflicts_with = "all")]
    pub copy: bool,

    /// Canvas width in pixels.
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,

    /// Canvas height in pixels.
    #[arg(long, value_name = "PX")]
    pub height: Option<u32>,

    /// Caption font family (falls back to the system sans-serif).
    #[arg(long, value_name = "FAMILY")]
    pub font: Option<String>,

    /// Caption font weight (400 regular, 700 bold).
    #[arg(long, value_name = "WEIGHT")]
    pub weight: Option<u16>,

    /// TTF / OTF file to use instead of a system font.
    #[arg(long, value_name = "FILE")]
    pub font_file: Option<PathBuf>,

    /// Caption fill colour as r,g,b[,a].
    #[arg(long, value_name = "R,G,B[,A]")]
    pub fill: Option<String>,

    /// Caption outline colour as r,g,b[,a].
    #[arg(long, value_name = "R,G,B[,A]")]
    pub stroke: Option<String>,

    /// Caption outline width in pixels.
    #[arg(long, value_name = "PX")]
    pub stroke_width: Option<f32>,

    /// Smallest font size the caption may shrink to.
    #[arg(long, value_name = "PX")]
    pub min_font_size: Option<u32>,

    /// Image resampling: nearest, bilinear, bicubic, lanczos3.
    #[arg(long, value_name = "MODE")]
    pub interpolation: Option<String>,

    /// Persist the effective settings as the new defaults.
    #[arg(long)]
    pub save_settings: bool,

    /// List the built-in meme templates and exit.
    #[arg(long)]
    pub list_templates: bool,

    /// Print the name and image URL of a built-in template and exit.
    #[arg(long, value_name = "ID", conflicts_with = "list_templates")]
    pub template: Option<String>,

    /// Print caption candidates, layout details and per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Layer command-line overrides on top of stored settings.
    pub fn apply_overrides(&self, settings: &mut MemeSettings) -> Result<(), String> {
        if let Some(w) = self.width {
            if w == 0 {
                return Err("--width must be greater than zero".to_string());
            }
            settings.canvas_width = w;
        }
        if let Some(h) = self.height {
            if h == 0 {
                return Err("--height must be greater than zero".to_string());
            }
            settings.canvas_height = h;
        }
        if let Some(font) = &self.font {
            settings.font_family = font.clone();
        }
        if let Some(weight) = self.weight {
            settings.font_weight = weight;
        }
        if let Some(path) = &self.font_file {
            settings.font_path = path.display().to_string();
        }
        if let Some(fill) = &self.fill {
            settings.fill_color = MemeSettings::str_to_color(fill)
                .ok_or_else(|| format!("invalid --fill colour '{}'", fill))?;
        }
        if let Some(stroke) = &self.stroke {
            settings.stroke_color = MemeSettings::str_to_color(stroke)
                .ok_or_else(|| format!("invalid --stroke colour '{}'", stroke))?;
        }
        if let Some(sw) = self.stroke_width {
            if !(0.0..=MAX_STROKE_WIDTH).contains(&sw) {
                return Err(format!("--stroke-width must be between 0 and {}", MAX_STROKE_WIDTH));
            }
            settings.stroke_width = sw;
        }
        if let Some(min) = self.min_font_size {
            settings.min_font_size = min;
        }
        if let Some(name) = &self.interpolation {
            settings.interpolation = Interpolation::from_name(name)
                .ok_or_else(|| format!("unknown --interpolation '{}'", name))?;
        }
        Ok(())
    }

    fn caption_supplier(&self) -> Option<Box<dyn CaptionSupplier>> {
        if let Some(path) = &self.captions_file {
            return Some(Box::new(JsonCaptionFile::new(path)));
        }
        if !self.caption.is_empty() {
            return Some(Box::new(StaticCaptions(self.caption.clone())));
        }
        None
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all inputs succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.list_templates {
        for t in MEME_TEMPLATES {
            println!("{:<16} {:<22} {}", t.id, t.name, t.url);
        }
        return ExitCode::SUCCESS;
    }
    if let Some(id) = &args.template {
        return match describe_template(id) {
            Ok(line) => {
                println!("{}", line);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let mut settings = MemeSettings::load();
    if let Err(e) = args.apply_overrides(&mut settings) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    if args.save_settings {
        match settings.save() {
            Ok(path) => println!("settings saved to {}", path.display()),
            Err(e) => {
                eprintln!("error: could not save settings: {}", e);
                return ExitCode::FAILURE;
            }
        }
        if args.input.is_empty() && !args.paste {
            return ExitCode::SUCCESS;
        }
    }

    if args.pick == 0 {
        eprintln!("error: --pick is 1-based.");
        return ExitCode::FAILURE;
    }

    // Resolve glob patterns / literal paths → concrete sources
    let mut sources: Vec<(String, Box<dyn ImageSource>)> = Vec::new();
    if args.paste {
        let source: Box<dyn ImageSource> = Box::new(ClipboardImageSource);
        sources.push(("clipboard".to_string(), source));
    } else {
        let inputs = resolve_inputs(&args.input);
        if inputs.is_empty() {
            eprintln!("error: no input files matched the given pattern(s).");
            return ExitCode::FAILURE;
        }
        for path in inputs {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let source: Box<dyn ImageSource> = Box::new(FileImageSource::new(path));
            sources.push((stem, source));
        }
    }

    // Multiple inputs require --output-dir, not --output
    if sources.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            sources.len()
        );
        return ExitCode::FAILURE;
    }

    let face = match resolve_face(&settings.font_family, settings.font_weight, settings.font_path()) {
        Ok(face) => face,
        Err(e) => {
            eprintln!("error: {}", e);
            crate::log_err!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let compositor = Rc::new(
        Compositor::new(face)
            .with_style(settings.caption_style())
            .with_interpolation(settings.interpolation),
    );
    let supplier = args.caption_supplier();

    let total = sources.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, (stem, source)) in sources.into_iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, source.describe());
        }
        let file_start = Instant::now();

        let output = build_output_path(
            &stem,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            &settings.output_name,
            multi,
        );

        match run_one(source, &output, supplier.as_deref(), &compositor, &settings, &args) {
            Ok(written) => {
                for path in &written {
                    if args.verbose || multi || args.all {
                        println!(
                            "  → {} ({:.0}ms)",
                            path.display(),
                            file_start.elapsed().as_secs_f64() * 1000.0
                        );
                    }
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                crate::log_err!("{}: {}", stem, e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        if let (Some(path), Some(id)) = (crate::logger::log_path(), crate::logger::run_id()) {
            eprintln!("details in {} (run {})", path.display(), id);
        }
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-image pipeline
// ============================================================================

fn run_one(
    source:     Box<dyn ImageSource>,
    output:     &Path,
    supplier:   Option<&dyn CaptionSupplier>,
    compositor: &Rc<Compositor<FontFace>>,
    settings:   &MemeSettings,
    args:       &CliArgs,
) -> Result<Vec<PathBuf>, String> {
    // -- Step 1: Decode ----------------------------------------------------
    let mut session = MemeSession::new(settings.canvas_width, settings.canvas_height);
    session.attach_compositor(Rc::clone(compositor));
    session.begin_decode(source);
    session.wait_for_decode().map_err(|e| format!("load failed: {}", e))?;

    // -- Step 2: Captions (optional) ---------------------------------------
    if let Some(supplier) = supplier {
        session
            .load_captions(supplier)
            .map_err(|e| format!("captions: {}", e))?;
        if args.verbose {
            for (i, caption) in session.captions().items().iter().enumerate() {
                println!("  {}. {}", i + 1, caption);
            }
        }
    }

    // -- Step 3a: Every candidate to its own file --------------------------
    if args.all && !session.captions().is_empty() {
        let image = session.image().ok_or("no image decoded")?;
        let compositor: &Compositor<FontFace> = compositor;
        let (w, h) = (settings.canvas_width, settings.canvas_height);
        return session
            .captions()
            .items()
            .par_iter()
            .enumerate()
            .map(|(i, caption)| -> Result<PathBuf, String> {
                let mut surface = CanvasSurface::new(w, h);
                compositor
                    .render(&mut surface, image, Some(caption))
                    .map_err(|e| format!("render failed: {}", e))?;
                let mut sink = PngFileSink::new(numbered(output, i + 1));
                sink.export(&surface).map_err(|e| format!("save failed: {}", e))?;
                Ok(sink.path)
            })
            .collect();
    }

    // -- Step 3b: The picked candidate -------------------------------------
    if !session.captions().is_empty() {
        session
            .select_caption(args.pick - 1)
            .map_err(|e| format!("captions: {}", e))?;
    }
    if args.verbose
        && let Some(report) = session.last_report()
    {
        println!(
            "  fit {:.0}x{:.0} at ({:.0}, {:.0}), caption size {}",
            report.fit.w,
            report.fit.h,
            report.fit.x,
            report.fit.y,
            report.font_size.map_or("-".to_string(), |s| s.to_string())
        );
    }

    let mut written = Vec::new();
    // `--copy` on its own means clipboard only
    if !args.copy || args.output.is_some() || args.output_dir.is_some() {
        let mut sink = PngFileSink::new(output);
        session.export(&mut sink).map_err(|e| format!("save failed: {}", e))?;
        written.push(sink.path);
    }
    if args.copy {
        session
            .export(&mut ClipboardSink)
            .map_err(|e| format!("copy failed: {}", e))?;
        println!("  → clipboard");
    }
    Ok(written)
}

// ============================================================================
// Helpers
// ============================================================================

/// `name<TAB>url` for a template id.
fn describe_template(id: &str) -> Result<String, String> {
    find_template(id)
        .map(|t| format!("{}\t{}", t.name, t.url))
        .ok_or_else(|| format!("unknown template '{}' (see --list-templates)", id))
}

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

/// Compute the output path for one input.
///
/// Priority:
/// 1. `--output` (explicit path, single input only)
/// 2. `--output-dir` (`<stem>_meme.png` for batches, `meme.png` otherwise)
/// 3. Current directory, same naming as 2.
fn build_output_path(
    stem:        &str,
    output:      Option<&Path>,
    output_dir:  Option<&Path>,
    output_name: &str,
    multi:       bool,
) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    let name = if multi {
        let ext = Path::new(output_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        format!("{}_meme.{}", stem, ext)
    } else {
        output_name.to_string()
    };
    match output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// `dir/meme.png` → `dir/meme_3.png`
fn numbered(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "meme".to_string());
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, n, ext),
        None => format!("{}_{}", stem, n),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("memefe").chain(argv.iter().copied()))
    }

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn input_is_required_unless_pasting_or_listing() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--paste"]).is_ok());
        assert!(parse(&["--list-templates"]).is_ok());
        assert!(parse(&["-i", "a.png", "--paste"]).is_err());
    }

    #[test]
    fn caption_sources_are_exclusive() {
        assert!(parse(&["-i", "a.png", "-c", "x", "--captions-file", "c.json"]).is_err());
        let args = parse(&["-i", "a.png", "-c", "one", "-c", "two", "--pick", "2"]).unwrap();
        assert_eq!(args.caption, vec!["one", "two"]);
        assert_eq!(args.pick, 2);
    }

    #[test]
    fn copy_needs_a_single_rendered_meme() {
        assert!(parse(&["-i", "a.png", "-c", "x", "--all", "--copy"]).is_err());
        assert!(parse(&["-i", "a.png", "-c", "x", "--pick", "1", "--copy"]).is_ok());
    }

    #[test]
    fn template_lookup_stands_alone() {
        let args = parse(&["--template", "DRAKE"]).unwrap();
        assert_eq!(args.template.as_deref(), Some("DRAKE"));
        assert_eq!(
            describe_template("drake").unwrap(),
            "Drake Hotline Bling\thttps://i.imgflip.com/30b1gx.jpg"
        );
        assert!(describe_template("doge").is_err());
    }

    #[test]
    fn overrides_layer_on_settings() {
        let args = parse(&[
            "-i", "a.png", "--width", "640", "--fill", "255,0,0", "--interpolation", "nearest",
            "--font-file", "/tmp/f.ttf",
        ])
        .unwrap();
        let mut s = MemeSettings::default();
        args.apply_overrides(&mut s).unwrap();
        assert_eq!(s.canvas_width, 640);
        assert_eq!(s.canvas_height, 450);
        assert_eq!(s.fill_color, [255, 0, 0, 255]);
        assert_eq!(s.interpolation, Interpolation::Nearest);
        assert_eq!(s.font_path(), Some(Path::new("/tmp/f.ttf")));
    }

    #[test]
    fn bad_overrides_are_reported() {
        let mut s = MemeSettings::default();
        assert!(parse(&["-i", "a", "--width", "0"]).unwrap().apply_overrides(&mut s).is_err());
        assert!(parse(&["-i", "a", "--stroke", "red"]).unwrap().apply_overrides(&mut s).is_err());
        assert!(parse(&["-i", "a", "--interpolation", "box"]).unwrap().apply_overrides(&mut s).is_err());
        assert!(parse(&["-i", "a", "--stroke-width", "1e9"]).unwrap().apply_overrides(&mut s).is_err());
        assert!(parse(&["-i", "a", "--stroke-width", "NaN"]).unwrap().apply_overrides(&mut s).is_err());
        assert_eq!(s.stroke_width, 4.0);
    }

    #[test]
    fn output_path_priorities() {
        let explicit = build_output_path("cat", Some(Path::new("x/y.png")), Some(Path::new("d")), "meme.png", false);
        assert_eq!(explicit, PathBuf::from("x/y.png"));
        assert_eq!(build_output_path("cat", None, Some(Path::new("d")), "meme.png", false), PathBuf::from("d/meme.png"));
        assert_eq!(build_output_path("cat", None, Some(Path::new("d")), "meme.png", true), PathBuf::from("d/cat_meme.png"));
        assert_eq!(build_output_path("cat", None, None, "meme.png", false), PathBuf::from("meme.png"));
    }

    #[test]
    fn numbered_inserts_index_before_extension() {
        assert_eq!(numbered(Path::new("out/meme.png"), 3), PathBuf::from("out/meme_3.png"));
        assert_eq!(numbered(Path::new("meme"), 1), PathBuf::from("meme_1"));
    }

    #[test]
    fn literal_inputs_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"x").unwrap();
        let p = file.display().to_string();
        assert_eq!(resolve_inputs(&[p.clone(), p]), vec![file]);
    }

    #[test]
    fn glob_inputs_expand() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let pattern = dir.path().join("*.png").display().to_string();
        let found = resolve_inputs(&[pattern]);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().is_some_and(|e| e == "png")));
    }
}
