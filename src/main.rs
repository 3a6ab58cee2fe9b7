use log::{error, info};
use netatmo_neuron::config::OPTIONS;
use netatmo_neuron::{Config, NeuronError, ResultRecord};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

/// Command line split into the env-file choice and per-option overrides.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    env_file: Option<PathBuf>,
    overrides: Vec<(String, String)>,
}

fn parse_cli<I: Iterator<Item = String>>(mut args: I) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();

    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        let Some(flag) = arg.strip_prefix("--") else {
            return Err(format!("unrecognised argument: {}", arg));
        };
        let (name, inline) = match flag.split_once('=') {
            Some((n, v)) => (n.to_string(), Some(v.to_string())),
            None => (flag.to_string(), None),
        };
        let value = match inline {
            Some(v) => v,
            None => args.next().ok_or_else(|| format!("`--{}` requires a value", name))?,
        };
        if value.is_empty() {
            return Err(format!("`--{}` requires a value", name));
        }

        if name == "env-file" {
            if cli.env_file.is_some() {
                return Err("`--env-file` provided more than once".to_string());
            }
            cli.env_file = Some(PathBuf::from(value));
        } else if OPTIONS.iter().any(|(f, _)| *f == name) {
            cli.overrides.push((name, value));
        } else {
            return Err(format!("unrecognised option: --{}", name));
        }
    }

    Ok(cli)
}

fn load_env(cli: &CliArgs) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = &cli.env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        load_env_file(path)?;
        return Ok(Some(LoadedEnvFile {
            path: path.clone(),
            explicit: true,
        }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if !default_path.is_file() {
        return Ok(None);
    }
    load_env_file(&default_path)?;
    Ok(Some(LoadedEnvFile {
        path: default_path,
        explicit: false,
    }))
}

fn load_env_file(path: &Path) -> Result<(), String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    for (index, line) in contents.lines().enumerate() {
        let assignment = parse_env_line(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?;
        let Some((key, value)) = assignment else { continue };
        // The process environment wins over the file.
        if std::env::var_os(&key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(())
}

/// One `.env` line: blank, `# comment`, or `[export ]KEY=value`.
fn parse_env_line(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let (key, raw) = line.split_once('=').ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.contains(char::is_whitespace) {
        return Err(format!("environment variable name contains whitespace: {}", key));
    }

    let raw = raw.trim();
    let value = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => unquote(&raw[1..], quote)?,
        _ => raw.split('#').next().unwrap_or_default().trim_end().to_string(),
    };
    Ok(Some((key.to_string(), value)))
}

/// Read up to the closing `quote`; escapes are only honoured inside double quotes.
fn unquote(input: &str, quote: char) -> Result<String, String> {
    let mut value = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if quote == '"' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| "unterminated escape sequence in double-quoted value".to_string())?;
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            c if c == quote => {
                let rest = chars.as_str().trim();
                if rest.is_empty() || rest.starts_with('#') {
                    return Ok(value);
                }
                return Err(format!("unexpected characters after closing {} quote", quote));
            }
            c => value.push(c),
        }
    }

    Err(format!("unterminated {}-quoted value", quote))
}

/// Print the record as one line of JSON on stdout.
fn say_json(record: ResultRecord) {
    let mut out = std::io::stdout().lock();
    match serde_json::to_string(&record) {
        Ok(line) => {
            if let Err(e) = writeln!(out, "{}", line) {
                error!("writing result failed: {}", e);
            }
        }
        Err(e) => error!("serializing result failed: {}", e),
    }
}

fn main() {
    let setup = parse_cli(std::env::args().skip(1)).and_then(|cli| load_env(&cli).map(|env| (cli, env)));
    let (cli, loaded_env) = match setup {
        Ok(v) => v,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(2);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "netatmo-neuron {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );

    let mut cfg = Config::from_env();
    for (flag, value) in cli.overrides {
        let known = cfg.set(&flag, value);
        debug_assert!(known, "parse_cli let through unknown option --{}", flag);
    }
    log::debug!("{:?}", cfg);

    if let Err(e) = netatmo_neuron::run(&cfg, &mut say_json) {
        error!("fatal: {}", e);
        let code = match e {
            NeuronError::Parameter(_) => 2,
            NeuronError::Client(_) => 1,
        };
        std::process::exit(code);
    }
}
