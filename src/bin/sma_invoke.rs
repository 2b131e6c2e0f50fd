use sma_bridge::{init_logging, BridgeConfig, GeneralSma, LogConfig, SmaInterface};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, Level};

const EXIT_USAGE: u8 = 1;
const EXIT_LOAD: u8 = 2;
const EXIT_INVOKE: u8 = 3;

/// Positional payload meaning "read from stdin"
const STDIN_PAYLOAD: &str = "-";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    library: Option<PathBuf>,
    payload: Option<String>,
    pretty: bool,
    verbose: bool,
    print_config: bool,
    help: bool,
}

impl Args {
    fn from_env() -> Result<Self, String> {
        let mut argv = std::env::args();
        let prog = argv.next().unwrap_or_else(|| "sma-invoke".to_string());
        Self::parse(&prog, argv)
    }

    fn parse(prog: &str, argv: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut args = Self::default();
        let mut argv = argv.into_iter();

        while let Some(arg) = argv.next() {
            match arg.as_str() {
                "--help" | "-h" => args.help = true,
                "--pretty" => args.pretty = true,
                "--verbose" | "-v" => args.verbose = true,
                "--print-config" => args.print_config = true,
                "--config" | "-c" => {
                    let value = argv.next().ok_or("--config requires a file")?;
                    args.config = Some(PathBuf::from(value));
                }
                "--library" | "-l" => {
                    let value = argv.next().ok_or("--library requires a path")?;
                    args.library = Some(PathBuf::from(value));
                }
                opt if opt.starts_with('-') && opt != STDIN_PAYLOAD => {
                    return Err(format!("Unknown option: {}\n\n{}", opt, Self::usage(prog)))
                }
                payload => {
                    if args.payload.is_some() {
                        return Err("Only one payload may be given".to_string());
                    }
                    args.payload = Some(payload.to_string());
                }
            }
        }

        Ok(args)
    }

    /// Payload given on the command line, `None` when it comes from stdin
    fn inline_payload(&self) -> Option<&str> {
        self.payload.as_deref().filter(|p| *p != STDIN_PAYLOAD)
    }

    fn usage(prog: &str) -> String {
        format!(
            "sma-invoke - send one payload to the native SMA library\n\n\
            USAGE:\n    {} [OPTIONS] [PAYLOAD]\n\n\
            Reads the payload from stdin when PAYLOAD is absent or '-'.\n\
            A single trailing newline (\\n or \\r\\n) is removed from stdin input.\n\n\
            OPTIONS:\n    \
            -c, --config <FILE>    TOML configuration file\n    \
            -l, --library <PATH>   Explicit library path\n    \
            --pretty               Pretty-print JSON responses\n    \
            --print-config         Print the default configuration and exit\n    \
            -v, --verbose          Debug logging and call statistics\n    \
            -h, --help             Print help information",
            prog
        )
    }
}

fn load_config(args: &Args) -> Result<BridgeConfig, String> {
    let config = match &args.config {
        Some(path) => BridgeConfig::load(path),
        None => BridgeConfig::discover(),
    }
    .map_err(|e| e.to_string())?;

    let mut config = config.with_env_overrides();
    if let Some(library) = &args.library {
        config.library.path = Some(library.clone());
    }
    Ok(config)
}

fn read_payload(args: &Args, mut input: impl Read) -> Result<String, String> {
    if let Some(payload) = args.inline_payload() {
        return Ok(payload.to_string());
    }

    let mut buf = String::new();
    input
        .read_to_string(&mut buf)
        .map_err(|e| format!("Failed to read payload from stdin: {}", e))?;
    Ok(strip_line_ending(&buf).to_string())
}

/// Drop one trailing `\n` or `\r\n`, as left by `echo` or a text editor
fn strip_line_ending(text: &str) -> &str {
    match text.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => text,
    }
}

fn render(response: &str, pretty: bool) -> String {
    if !pretty {
        return response.to_string();
    }

    serde_json::from_str::<serde_json::Value>(response)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| response.to_string())
}

/// Execute one invocation and return the process exit code
fn run(args: &Args, input: impl Read, out: &mut impl Write, err: &mut impl Write) -> u8 {
    if args.print_config {
        return match writeln!(out, "{}", BridgeConfig::generate_default()) {
            Ok(()) => 0,
            Err(_) => EXIT_USAGE,
        };
    }

    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            let _ = writeln!(err, "{}", e);
            return EXIT_USAGE;
        }
    };

    let mut log_config = LogConfig::from_settings(&config.logging);
    if args.verbose {
        log_config = log_config.with_level(Level::DEBUG);
    }
    let _guard = init_logging(log_config);

    debug!(library = ?config.library.path, "configuration loaded");

    let payload = match read_payload(args, input) {
        Ok(payload) => payload,
        Err(e) => {
            let _ = writeln!(err, "{}", e);
            return EXIT_USAGE;
        }
    };

    let sma = match GeneralSma::with_config(&config) {
        Ok(sma) => sma,
        Err(e) => {
            error!(error = %e, "failed to load SMA library");
            let _ = writeln!(err, "{}", e);
            return EXIT_LOAD;
        }
    };

    let result = sma.invoke(&payload);

    if args.verbose {
        let stats = sma.stats();
        let _ = writeln!(
            err,
            "library: {}\ncalls: {}, released: {}, call failures: {}, decode failures: {}",
            sma.library_path().display(),
            stats.calls_made,
            stats.buffers_released,
            stats.call_failures,
            stats.decode_failures
        );
    }

    match result {
        Ok(response) => match writeln!(out, "{}", render(&response, args.pretty)) {
            Ok(()) => 0,
            Err(e) => {
                let _ = writeln!(err, "Failed to write response: {}", e);
                EXIT_INVOKE
            }
        },
        Err(e) => {
            error!(error = %e, "invoke failed");
            let _ = writeln!(err, "{}", e);
            EXIT_INVOKE
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if args.help {
        let prog = std::env::args().next().unwrap_or_else(|| "sma-invoke".to_string());
        println!("{}", Args::usage(&prog));
        return ExitCode::SUCCESS;
    }

    let code = run(
        &args,
        std::io::stdin().lock(),
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    );
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        Args::parse("sma-invoke", args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&["-c", "sma.toml", "--pretty", "{\"a\":1}"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("sma.toml")));
        assert!(args.pretty);
        assert_eq!(args.inline_payload(), Some("{\"a\":1}"));

        let args = parse(&["--library", "/tmp/lib.so", "-"]).unwrap();
        assert_eq!(args.library, Some(PathBuf::from("/tmp/lib.so")));
        assert_eq!(args.payload.as_deref(), Some("-"));
        assert!(args.inline_payload().is_none());

        assert!(parse(&[]).unwrap().inline_payload().is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--bogus"]).unwrap_err().starts_with("Unknown option: --bogus"));
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["a", "b"]).is_err());
    }

    #[test]
    fn test_stdin_marker_counts_as_payload() {
        assert!(parse(&["a", "-"]).is_err());
        assert!(parse(&["-", "a"]).is_err());
        assert!(parse(&["-", "-"]).is_err());
    }

    #[test]
    fn test_help_flag() {
        let args = parse(&["-h"]).unwrap();
        assert!(args.help);
        assert!(parse(&["--pretty", "--help"]).unwrap().help);
        assert!(Args::usage("sma-invoke").contains("USAGE"));
    }

    #[test]
    fn test_strip_line_ending() {
        assert_eq!(strip_line_ending("ping\n"), "ping");
        assert_eq!(strip_line_ending("ping\r\n"), "ping");
        assert_eq!(strip_line_ending("ping\n\n"), "ping\n");
        assert_eq!(strip_line_ending("ping\r"), "ping\r");
        assert_eq!(strip_line_ending("ping"), "ping");
        assert_eq!(strip_line_ending("\n"), "");
    }

    #[test]
    fn test_read_payload_from_input() {
        let args = parse(&[]).unwrap();
        assert_eq!(read_payload(&args, &b"{\"a\":1}\n\n"[..]).unwrap(), "{\"a\":1}\n");

        let args = parse(&["-"]).unwrap();
        assert_eq!(read_payload(&args, &b"ping\r\n"[..]).unwrap(), "ping");

        let args = parse(&["inline"]).unwrap();
        assert_eq!(read_payload(&args, &b"ignored"[..]).unwrap(), "inline");
    }

    #[test]
    fn test_render() {
        assert_eq!(render("{\"a\":1}", true), "{\n  \"a\": 1\n}");
        assert_eq!(render("not json", true), "not json");
        assert_eq!(render("{\"a\":1}", false), "{\"a\":1}");
    }

    #[test]
    fn test_run_print_config() {
        let args = parse(&["--print-config"]).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        assert_eq!(run(&args, std::io::empty(), &mut out, &mut err), 0);
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(BridgeConfig::parse(&printed).unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_run_malformed_config_is_usage_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sma.toml");
        std::fs::write(&path, "[library\n").unwrap();

        let config = path.to_string_lossy().into_owned();
        let args = parse(&["-c", &config, "ping"]).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        assert_eq!(run(&args, std::io::empty(), &mut out, &mut err), EXIT_USAGE);
        assert!(out.is_empty());
        assert!(!err.is_empty());
    }

    #[test]
    fn test_run_missing_library_is_load_error() {
        let args = parse(&["-l", "/nonexistent/libsma.so", "ping"]).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        assert_eq!(run(&args, std::io::empty(), &mut out, &mut err), EXIT_LOAD);
        assert!(out.is_empty());
        assert!(String::from_utf8(err).unwrap().contains("/nonexistent/libsma.so"));
    }

    /// Runs against glibc with the given export pair
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    mod glibc {
        use super::*;

        fn libc_config(invoke: &str, free: &str) -> tempfile::NamedTempFile {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(
                file,
                "[library]\ninvoke_symbol = \"{}\"\nfree_symbol = \"{}\"\n",
                invoke, free
            )
            .unwrap();
            file
        }

        fn run_with(
            config: &tempfile::NamedTempFile,
            extra: &[&str],
            stdin: &[u8],
        ) -> (u8, String, String) {
            let config = config.path().to_string_lossy().into_owned();
            let mut argv = vec!["-c", config.as_str(), "-l", "libc.so.6"];
            argv.extend_from_slice(extra);
            let args = parse(&argv).unwrap();

            let (mut out, mut err) = (Vec::new(), Vec::new());
            let code = run(&args, stdin, &mut out, &mut err);
            (
                code,
                String::from_utf8(out).unwrap(),
                String::from_utf8(err).unwrap(),
            )
        }

        #[test]
        fn test_run_stdin_payload() {
            let config = libc_config("strdup", "free");

            let (code, out, _) = run_with(&config, &[], b"{\"method\":\"ping\"}\n");
            assert_eq!(code, 0);
            assert_eq!(out, "{\"method\":\"ping\"}\n");

            let (code, out, _) = run_with(&config, &["-"], b"line one\nline two\n\n");
            assert_eq!(code, 0);
            assert_eq!(out, "line one\nline two\n\n");
        }

        #[test]
        fn test_run_inline_payload_pretty() {
            let config = libc_config("strdup", "free");

            let (code, out, _) = run_with(&config, &["--pretty", "{\"a\":1}"], b"");
            assert_eq!(code, 0);
            assert_eq!(out, "{\n  \"a\": 1\n}\n");
        }

        #[test]
        fn test_run_verbose_reports_stats() {
            let config = libc_config("strdup", "free");

            let (code, _, err) = run_with(&config, &["-v", "ping"], b"");
            assert_eq!(code, 0);
            assert!(err.contains("calls: 1, released: 1"));
        }

        #[test]
        fn test_run_null_response_is_invoke_error() {
            // getenv returns null for an unset variable
            let config = libc_config("getenv", "free");

            let (code, out, err) = run_with(&config, &["SMA_BRIDGE_UNSET_VARIABLE"], b"");
            assert_eq!(code, EXIT_INVOKE);
            assert!(out.is_empty());
            assert!(!err.is_empty());
        }

        #[test]
        fn test_run_interior_nul_is_invoke_error() {
            let config = libc_config("strdup", "free");

            let (code, out, _) = run_with(&config, &[], b"pi\0ng");
            assert_eq!(code, EXIT_INVOKE);
            assert!(out.is_empty());
        }

        #[test]
        fn test_run_missing_symbol_is_load_error() {
            let config = libc_config("sma_no_such_export", "free");

            let (code, _, err) = run_with(&config, &["ping"], b"");
            assert_eq!(code, EXIT_LOAD);
            assert!(err.contains("sma_no_such_export"));
        }
    }
}
