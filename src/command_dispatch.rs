//! Purpose: Hold top-level CLI command dispatch for `layerlens`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every structure is bounded by the CLI options (structure and tetrahedron limits).
//! Invariants: Helpers in `main.rs` own I/O and error rendering.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    options: EngineOptions,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "layerlens", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Build { p, q, out } => {
            let mut engine = Engine::with_options(options);
            let (tri_handle, lens_handle) = engine.build_layered_lens_space(p, q)?;
            let tri = engine.triangulation(tri_handle)?;
            let lens = engine.lens_space(lens_handle)?;

            let mut report = Map::new();
            report.insert("lens_space".to_string(), lens_space_json(lens));
            report.insert("skeleton".to_string(), skeleton_json(tri, &tri.skeleton()));
            match out {
                Some(path) if is_stdio(&path) => {
                    // The triangulation alone goes to stdout so it can be piped.
                    emit_json(triangulation_json(tri)?);
                    return Ok(RunOutcome::ok());
                }
                Some(path) => {
                    write_triangulation(&path, tri)?;
                    report.insert("out".to_string(), json!(path.display().to_string()));
                }
                None => {
                    report.insert("triangulation".to_string(), triangulation_json(tri)?);
                }
            }
            emit_json(Value::Object(report));
            Ok(RunOutcome::ok())
        }
        Command::Torus { a, b } => {
            let mut tri = Triangulation::new();
            let torus =
                LayeredSolidTorus::insert_within(&mut tri, a, b, options.max_tetrahedra())?;
            emit_json(json!({
                "torus": torus_json(&torus),
                "triangulation": triangulation_json(&tri)?,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Name { p, q } => {
            let lens = LensSpace::new(p, q)?;
            emit_json(json!({
                "input": { "p": p, "q": q },
                "lens_space": manifold_json(&lens),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Recognize { file } => {
            let tri = read_triangulation(file.as_deref())?;
            let mut engine = Engine::with_options(options);
            let tri_handle = engine.insert_triangulation(tri)?;
            let found = engine.recognize(tri_handle)?;

            let tri = engine.triangulation(tri_handle)?;
            let lens_spaces = found
                .iter()
                .map(|&handle| engine.lens_space(handle).map(lens_space_json))
                .collect::<Result<Vec<_>, Error>>()?;
            emit_json(json!({
                "skeleton": skeleton_json(tri, &tri.skeleton()),
                "lens_spaces": lens_spaces,
            }));
            Ok(RunOutcome::ok())
        }
    }
}
