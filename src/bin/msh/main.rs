//! MSH CLI - Tool for inspecting and re-encoding .msh files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use msh::scene::{Model, ModelKind, Scene};
use msh::{EncodeOptions, NoMeshes, ReadOptions};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("MSH_BUILD_DATE"),
    " ",
    env!("MSH_BUILD_TIME"),
    ")"
);

#[derive(Parser)]
#[command(name = "msh", version, long_version = LONG_VERSION)]
#[command(about = "MSH file toolkit")]
struct Cli {
    /// Show debug output (-vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Read files into memory instead of mapping them
    #[arg(long, global = true)]
    no_mmap: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show scene summary and object counts
    #[command(alias = "i")]
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the model hierarchy
    #[command(alias = "t")]
    Tree { file: PathBuf },
    /// Show the refined bone hierarchy
    #[command(alias = "s")]
    Skeleton { file: PathBuf },
    /// Dump model transforms (filter by name pattern)
    #[command(alias = "d")]
    Dump {
        file: PathBuf,
        pattern: Option<String>,
        /// Print JSON instead of text
        #[arg(short, long)]
        json: bool,
    },
    /// Decode and re-encode a file
    #[command(alias = "r")]
    Roundtrip {
        input: PathBuf,
        output: PathBuf,
        /// Write triangle lists instead of strips
        #[arg(long)]
        no_strips: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let opts = ReadOptions { use_mmap: !cli.no_mmap };
    let result = match &cli.command {
        Command::Info { files } => cmd_info(files, &opts),
        Command::Tree { file } => cmd_tree(file, &opts),
        Command::Skeleton { file } => cmd_skeleton(file, &opts),
        Command::Dump { file, pattern, json } => cmd_dump(file, pattern.as_deref(), *json, &opts),
        Command::Roundtrip { input, output, no_strips } => {
            cmd_roundtrip(input, output, *no_strips, &opts)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Some("error"),
        (false, 0) => None,
        (false, 1) => Some("debug"),
        (false, _) => Some("trace"),
    };
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path, opts: &ReadOptions) -> Result<Scene> {
    msh::read_file_opts(path, opts).with_context(|| format!("failed to open {}", path.display()))
}

fn kind_name(kind: ModelKind) -> &'static str {
    match kind {
        ModelKind::Null => "Null",
        ModelKind::Skin => "Skin",
        ModelKind::Bone => "Bone",
        ModelKind::Static => "Static",
    }
}

#[derive(Default)]
struct ModelCounts {
    null: usize,
    skin: usize,
    bone: usize,
    static_: usize,
    hidden: usize,
    segments: usize,
    vertices: usize,
    triangles: usize,
}

impl ModelCounts {
    fn from_scene(scene: &Scene) -> Self {
        let mut counts = Self::default();
        for model in &scene.models {
            match model.kind {
                ModelKind::Null => counts.null += 1,
                ModelKind::Skin => counts.skin += 1,
                ModelKind::Bone => counts.bone += 1,
                ModelKind::Static => counts.static_ += 1,
            }
            counts.hidden += model.hidden as usize;
            for seg in model.segments() {
                counts.segments += 1;
                counts.vertices += seg.num_vertices();
                counts.triangles += seg.triangle_list().len();
            }
        }
        counts
    }
}

fn cmd_info(files: &[PathBuf], opts: &ReadOptions) -> Result<()> {
    // Decode in parallel, print in argument order.
    let scenes: Vec<Result<Scene>> = files.par_iter().map(|path| open(path, opts)).collect();

    for (path, scene) in files.iter().zip(scenes) {
        let scene = scene?;
        let counts = ModelCounts::from_scene(&scene);

        println!("File: {}", path.display());
        println!("Scene: {}", scene.name);
        println!("Materials: {}", scene.materials.len());
        println!();
        println!("Models:");
        println!("  Null:    {}", counts.null);
        println!("  Static:  {}", counts.static_);
        println!("  Skin:    {}", counts.skin);
        println!("  Bone:    {}", counts.bone);
        if counts.hidden > 0 {
            println!("  Hidden:  {}", counts.hidden);
        }
        println!(
            "  Geometry: {} segments, {} vertices, {} triangles",
            counts.segments, counts.vertices, counts.triangles
        );
        println!();
        println!("Skeleton: {} bones", scene.skeleton.len());
        match &scene.animation {
            Some(anim) => println!(
                "Animation: '{}' frames {}..{} at {} fps, {} keyed bones",
                anim.name,
                anim.start_index,
                anim.end_index,
                anim.framerate,
                anim.bone_frames.len()
            ),
            None => println!("Animation: none"),
        }
        if let Ok(bbox) = scene.bounds() {
            if !bbox.is_empty() {
                println!("Bounds: {:?} .. {:?}", bbox.min.to_array(), bbox.max.to_array());
            }
        }
        println!();
    }
    Ok(())
}

fn cmd_tree(path: &Path, opts: &ReadOptions) -> Result<()> {
    let scene = open(path, opts)?;
    let graph = scene.graph()?;

    println!("File: {}", path.display());
    println!();
    for root in graph.roots() {
        print_tree(&scene, &graph, root, 0);
    }
    Ok(())
}

fn print_tree(scene: &Scene, graph: &msh::scene::SceneGraph, index: usize, depth: usize) {
    let model = &scene.models[index];
    let indent = "  ".repeat(depth);
    let mut extra = String::new();
    if model.hidden {
        extra.push_str(" [hidden]");
    }
    if !model.segments().is_empty() {
        extra.push_str(&format!(" [{} segs, {} verts]", model.segments().len(), model.num_vertices()));
    }
    if let Some(prim) = &model.collision_primitive {
        extra.push_str(&format!(" [{:?}]", prim.shape));
    }
    println!("{}{} ({}){}", indent, model.name, kind_name(model.kind), extra);

    for child in graph.children(index) {
        print_tree(scene, graph, child, depth + 1);
    }
}

fn cmd_skeleton(path: &Path, opts: &ReadOptions) -> Result<()> {
    let scene = open(path, opts)?;
    let bones = msh::refine_skeleton(&scene)?;

    println!("File: {}", path.display());
    println!("Bones: {}", bones.len());
    println!();

    let mut depths = vec![0usize; bones.len()];
    for (i, bone) in bones.iter().enumerate() {
        // Parents precede children.
        if let Some(p) = bone.parent {
            depths[i] = depths[p] + 1;
        }
        let (pos, rot) = (bone.transform.translation, bone.transform.rotation);
        println!(
            "{}{}  pos: [{:.4}, {:.4}, {:.4}]  rot: [{:.4}, {:.4}, {:.4}, {:.4}]",
            "  ".repeat(depths[i]),
            bone.name,
            pos.x,
            pos.y,
            pos.z,
            rot.x,
            rot.y,
            rot.z,
            rot.w
        );
    }
    Ok(())
}

fn matches(model: &Model, pattern: Option<&str>) -> bool {
    pattern.map_or(true, |p| model.name.to_lowercase().contains(&p.to_lowercase()))
}

fn cmd_dump(path: &Path, pattern: Option<&str>, json_mode: bool, opts: &ReadOptions) -> Result<()> {
    let scene = open(path, opts)?;
    let graph = scene.graph()?;

    if json_mode {
        let objects: Vec<serde_json::Value> = graph
            .topological_order()
            .into_iter()
            .filter(|&i| matches(&scene.models[i], pattern))
            .map(|i| {
                let model = &scene.models[i];
                serde_json::json!({
                    "name": model.name,
                    "parent": model.parent,
                    "type": kind_name(model.kind),
                    "hidden": model.hidden,
                    "translation": model.transform.translation.to_array(),
                    "rotation": model.transform.rotation.to_array(),
                    "world": graph.world_matrix(&scene.models, i).to_cols_array_2d(),
                    "segments": model.segments().iter().map(|seg| serde_json::json!({
                        "material": seg.material_name,
                        "vertices": seg.num_vertices(),
                        "triangles": seg.triangle_list().len(),
                        "weighted": seg.weights.is_some(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        let materials: Vec<serde_json::Value> = scene
            .materials
            .values()
            .map(|mat| {
                serde_json::json!({
                    "name": mat.name,
                    "flags": mat.flags,
                    "rendertype": mat.rendertype,
                    "textures": mat.textures,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "file": path.display().to_string(),
                "scene": scene.name,
                "materials": materials,
                "models": objects,
            }))
            .unwrap_or_default()
        );
    } else {
        println!("File: {}", path.display());
        println!(
            "Transform Dump{}",
            pattern.map(|p| format!(" (filter: {})", p)).unwrap_or_default()
        );
        println!();
        for i in graph.topological_order() {
            let model = &scene.models[i];
            if !matches(model, pattern) {
                continue;
            }
            let t = model.transform.translation;
            let r = model.transform.rotation;
            println!("{} ({})", model.name, kind_name(model.kind));
            println!("  parent: {}", model.parent.as_deref().unwrap_or("-"));
            println!("  translation: [{:.4}, {:.4}, {:.4}]", t.x, t.y, t.z);
            println!("  rotation:    [{:.4}, {:.4}, {:.4}, {:.4}]", r.x, r.y, r.z, r.w);
            print_matrix(&graph.world_matrix(&scene.models, i), "  ");
            println!();
        }
    }
    Ok(())
}

fn print_matrix(m: &glam::Mat4, indent: &str) {
    println!("{}world:", indent);
    for row in 0..4 {
        let r = m.row(row);
        println!("{}  [{:10.4} {:10.4} {:10.4} {:10.4}]", indent, r.x, r.y, r.z, r.w);
    }
}

fn cmd_roundtrip(input: &Path, output: &Path, no_strips: bool, opts: &ReadOptions) -> Result<()> {
    tracing::info!(input = %input.display(), "reading");
    let scene = open(input, opts)?;

    let encode_opts = EncodeOptions {
        triangle_strips: !no_strips,
        ..EncodeOptions::default()
    };
    msh::write_file(output, &scene, &NoMeshes, &encode_opts)
        .with_context(|| format!("failed to write {}", output.display()))?;

    // Re-read to confirm the output decodes to the same geometry.
    let check = open(output, opts)?;
    let same_models = scene.models.len() == check.models.len()
        && scene
            .models
            .iter()
            .zip(&check.models)
            .all(|(a, b)| a.name == b.name && a.kind == b.kind && a.num_vertices() == b.num_vertices());

    println!("Input:    {} ({} models)", input.display(), scene.models.len());
    println!("Output:   {} ({} models)", output.display(), check.models.len());
    println!("Encoding: {}", if no_strips { "triangle lists" } else { "triangle strips" });
    if !same_models {
        anyhow::bail!("re-read scene differs from the input");
    }
    println!("Round-trip OK");
    Ok(())
}
