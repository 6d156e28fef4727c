use std::{env, fs, path::PathBuf, process};

use bundlepatch::{AssetContainer, ClassId, fields::json::to_json};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "bundleinspect".to_string());

    let rest: Vec<String> = args.collect();
    if rest.is_empty() {
        print_usage(&program);
        return Err("missing container path".to_string());
    }

    let mut path: Option<PathBuf> = None;
    let mut class_filter: Option<ClassId> = None;
    let mut record_to_dump: Option<i64> = None;

    let mut iter = rest.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            "--class" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--class requires a class id".to_string())?;
                let id = value
                    .parse::<i32>()
                    .map_err(|_| "--class expects an integer class id".to_string())?;
                class_filter = Some(ClassId(id));
            }
            "--record" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--record requires a path id".to_string())?;
                record_to_dump = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| "--record expects an integer path id".to_string())?,
                );
            }
            _ => {
                if path.is_none() {
                    path = Some(PathBuf::from(arg));
                } else {
                    print_usage(&program);
                    return Err(format!("unexpected argument: {arg}"));
                }
            }
        }
    }

    let Some(path) = path else {
        print_usage(&program);
        return Err("missing container path".to_string());
    };

    let container = AssetContainer::load(&path)
        .map_err(|err| format!("failed to open {}: {err}", path.display()))?;

    println!("File: {}", path.display());
    if let Ok(meta) = fs::metadata(&path) {
        println!("Size: {} bytes", meta.len());
    }
    println!("Target platform: {}", container.target_platform());
    println!("Records: {}", container.len());
    for (idx, dependency) in container.dependencies().iter().enumerate() {
        println!("Dependency {}: {dependency}", idx + 1);
    }

    let records: Vec<_> = container
        .records()
        .filter(|record| class_filter.is_none_or(|class_id| record.class_id == class_id))
        .collect();

    if records.is_empty() {
        println!("(no records)");
    } else {
        let name_width = records
            .iter()
            .map(|record| record.name().map_or(1, str::len))
            .max()
            .unwrap_or(4)
            .clamp(4, 48);
        println!(
            "\n{:>20}  {:<20}  {:<name_width$}",
            "Path ID",
            "Class",
            "Name",
            name_width = name_width
        );
        println!(
            "{:->20}  {:-<20}  {:-<name_width$}",
            "",
            "",
            "",
            name_width = name_width
        );

        for record in &records {
            println!(
                "{:>20}  {:<20}  {:<name_width$}",
                record.path_id,
                record.class_id.to_string(),
                truncated_name(record.name().unwrap_or("-"), name_width),
                name_width = name_width
            );
        }
    }

    if let Some(path_id) = record_to_dump {
        let record = container
            .record(path_id)
            .ok_or_else(|| format!("record {path_id} not found"))?;

        println!("\nRecord: {path_id}");
        println!("  Class: {} ({})", record.class_id, record.class_id.0);
        let pointers = record.tree.pointers();
        if !pointers.is_empty() {
            println!("  Pointers:");
            for (field, ptr) in pointers {
                println!("    {field} -> file {} / path {}", ptr.file_id, ptr.path_id);
            }
        }
        let dump = serde_json::to_string_pretty(&to_json(&record.tree))
            .map_err(|err| format!("unable to dump record {path_id}: {err}"))?;
        println!("\n{dump}");
    }

    Ok(())
}

fn print_usage(program: &str) {
    println!("Usage: {program} <CONTAINER> [--class <ID>] [--record <PATH_ID>]");
    println!("\nOptions:");
    println!("  --class <ID>        Only list records of this class id (e.g. 43 for Mesh)");
    println!("  --record <PATH_ID>  Dump a record's fields as JSON");
    println!("  -h, --help          Show this help message");
}

fn truncated_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else if width <= 1 {
        "…".to_string()
    } else {
        let mut truncated = name.chars().take(width - 1).collect::<String>();
        truncated.push('…');
        truncated
    }
}
