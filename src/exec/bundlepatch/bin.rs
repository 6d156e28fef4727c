use std::path::PathBuf;

#[derive(Debug)]
struct Cli {
    operations: PathBuf,
    verbose: bool,
}

fn main() {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "bundlepatch".to_string());

    let cli = match parse_command(&program, args) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            print_usage(&program);
            std::process::exit(1);
        }
    };

    if let Err(err) = bundlepatch::run_operations_file(&cli.operations, cli.verbose) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn parse_command(program: &str, args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut verbose = false;
    let mut operations: Option<PathBuf> = None;

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage(program);
                std::process::exit(0);
            }
            "-v" | "--verbose" => {
                verbose = true;
            }
            other if other.starts_with('-') => {
                return Err(format!("unexpected flag: {other}"));
            }
            other => {
                if operations.is_some() {
                    return Err(format!("unexpected argument: {other}"));
                }
                operations = Some(PathBuf::from(other));
            }
        }
    }

    let operations =
        operations.ok_or_else(|| format!("missing operations file\n\nSee '{program} --help'"))?;
    Ok(Cli {
        operations,
        verbose,
    })
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {program} [-v] <operations.json|operations.yaml>");
    eprintln!("");
    eprintln!("Operations:");
    eprintln!("  update-meshes-from-new-assets  Replace bundle meshes with freshly exported ones");
    eprintln!("  add-new-material               Add a material and its textures to a mesh renderer");
    eprintln!("  update-bones-from-new-assets   Copy bone transforms (and spring physics) by name");
    eprintln!("");
    eprintln!("Options:");
    eprintln!("  -v, --verbose   Emit detailed progress output");
    eprintln!("  -h, --help      Show this help message");
}
