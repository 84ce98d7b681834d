// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! bem-scene - convert between model snapshots and three.js scenes.
//!
//! ```text
//! bem-scene to-scene <model.json> [--no-triangulate] [-o out.json]
//! bem-scene from-scene <scene.json> [-o model.json]
//! bem-scene roundtrip <scene.json>
//! ```
//!
//! Output goes to stdout unless `-o` is given. Set `RUST_LOG` to change the
//! log level (default `info`); logs are written to stderr.

use anyhow::{bail, Context};
use bem_lite_model::{LogMessage, Model, ObjectType};
use bem_lite_scene::{
    ForwardOptions, ForwardTranslator, ReverseOptions, ReverseTranslator, ThreeScene,
};
use std::path::PathBuf;

const USAGE: &str = "usage:
  bem-scene to-scene <model.json> [--no-triangulate] [-o out.json]
  bem-scene from-scene <scene.json> [-o model.json]
  bem-scene roundtrip <scene.json>";

enum Command {
    ToScene {
        input: PathBuf,
        output: Option<PathBuf>,
        triangulate: bool,
    },
    FromScene {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    RoundTrip {
        input: PathBuf,
    },
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Command> {
    let mut args = args.into_iter();
    let command = args.next().context(USAGE)?;

    let mut input = None;
    let mut output = None;
    let mut triangulate = true;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => output = Some(PathBuf::from(args.next().context("-o needs a path")?)),
            "--no-triangulate" => triangulate = false,
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with('-') => bail!("unknown option {flag}\n{USAGE}"),
            _ if input.is_none() => input = Some(PathBuf::from(&arg)),
            _ => bail!("unexpected argument {arg}\n{USAGE}"),
        }
    }
    let input = input.context(USAGE)?;

    Ok(match command.as_str() {
        "to-scene" => Command::ToScene {
            input,
            output,
            triangulate,
        },
        "from-scene" => Command::FromScene { input, output },
        "roundtrip" => Command::RoundTrip { input },
        other => bail!("unknown command {other}\n{USAGE}"),
    })
}

fn read_scene(path: &PathBuf) -> anyhow::Result<ThreeScene> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(ThreeScene::from_json(&json)?)
}

fn write_output(output: Option<&PathBuf>, json: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, json).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn report(stage: &str, warnings: &[LogMessage], errors: &[LogMessage]) {
    for message in warnings.iter().chain(errors) {
        eprintln!("{stage}: {message}");
    }
    tracing::info!(stage, warnings = warnings.len(), errors = errors.len(), "translation finished");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match parse_args(std::env::args().skip(1))? {
        Command::ToScene {
            input,
            output,
            triangulate,
        } => {
            let json =
                std::fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
            let mut model = Model::from_json(&json)?;
            let mut translator = ForwardTranslator::new();
            let options = ForwardOptions {
                triangulate,
                ..Default::default()
            };
            let scene = translator.model_to_three_js(&mut model, &options)?;
            report("to-scene", &translator.warnings(), &translator.errors());
            write_output(output.as_ref(), &scene.to_json_pretty()?)?;
        }
        Command::FromScene { input, output } => {
            let scene = read_scene(&input)?;
            let mut translator = ReverseTranslator::new();
            let model = translator.model_from_three_js(&scene, &ReverseOptions::default())?;
            report("from-scene", &translator.warnings(), &translator.errors());
            write_output(output.as_ref(), &model.to_json_pretty()?)?;
        }
        Command::RoundTrip { input } => {
            let scene = read_scene(&input)?;
            let mut reverse = ReverseTranslator::new();
            let mut model = reverse.model_from_three_js(&scene, &ReverseOptions::default())?;
            report("reverse", &reverse.warnings(), &reverse.errors());

            let mut forward = ForwardTranslator::new();
            let options = ForwardOptions {
                triangulate: false,
                ..Default::default()
            };
            let again = forward.model_to_three_js(&mut model, &options)?;
            report("forward", &forward.warnings(), &forward.errors());

            for ty in [
                ObjectType::Space,
                ObjectType::Surface,
                ObjectType::SubSurface,
                ObjectType::ShadingSurface,
                ObjectType::InteriorPartitionSurface,
                ObjectType::DaylightingControl,
            ] {
                println!("{:<28}{}", ty.as_str(), model.objects_of_type(ty).len());
            }
            println!(
                "{:<28}{} -> {}",
                "Meshes",
                scene.object.children.len(),
                again.object.children.len()
            );
        }
    }
    Ok(())
}
