use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use dcx::{State, Status, exec, exec_str, exec_file, stdio};

const VERSION: &str = env!("CARGO_PKG_VERSION");

///interpreter thread stack, deep macro recursion lives here
const STACK_SIZE: usize = 512 << 20;

const HELPMSG: &str = "Options:
  -e EXPR   evaluate EXPR and exit
  -f FILE   evaluate FILE, then continue with standard input
  -s        safe mode: disable the shell escape
  -v        print version and exit
  -h        print this message and exit
Bare arguments are files, evaluated in order. Without any, standard input is evaluated.";

///what to evaluate, in order
#[derive(Default)]
struct Opts {
	expr: Option<String>,
	file: Option<PathBuf>,
	files: Vec<PathBuf>,
	safe: bool,
}

fn main() -> ExitCode {
	let mut args = std::env::args();
	let name = args.next()
		.as_deref()
		.and_then(|a| Path::new(a).file_name())
		.map_or_else(|| String::from("dcx"), |n| n.to_string_lossy().into_owned());

	if let Err(err) = SimpleLogger::new().with_level(LevelFilter::Warn).env().init() {
		eprintln!("{name}: {err}");
	}

	let mut opts = Opts::default();
	while let Some(arg) = args.next() {
		match arg.as_str() {
			"-e" | "-f" => {
				let Some(val) = args.next() else {
					eprintln!("{name}: option {arg} needs an argument");
					return ExitCode::FAILURE;
				};
				if arg == "-e" {opts.expr = Some(val);} else {opts.file = Some(val.into());}
			}
			"-s" => {opts.safe = true;}
			"-v" => {
				eprintln!("{name} {VERSION}");
				return ExitCode::SUCCESS;
			}
			"-h" => {
				eprintln!("Usage: {name} [OPTION] [file [...]]\n{HELPMSG}");
				return ExitCode::SUCCESS;
			}
			flag if flag.starts_with('-') && flag.len() > 1 => {
				eprintln!("{name}: unrecognized option {flag}, use -h for help");
				return ExitCode::FAILURE;
			}
			_ => {opts.files.push(PathBuf::from(&arg));}
		}
	}

	//deep macro nesting needs more than the main thread's stack
	let worker = std::thread::Builder::new()
		.name(name.clone())
		.stack_size(STACK_SIZE)
		.spawn(move || run(name, opts));
	match worker.map(|w| w.join()) {
		Ok(Ok(code)) => code,
		Ok(Err(_)) => ExitCode::FAILURE,
		Err(err) => {
			eprintln!("dcx: {err}");
			ExitCode::FAILURE
		}
	}
}

fn run(name: String, opts: Opts) -> ExitCode {
	let mut st = State::default().custom_name(name.clone()).safe(opts.safe);
	match eval_all(&mut st, opts) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("{name}: {err}");
			ExitCode::FAILURE
		}
	}
}

///`-e` alone, else `-f` and bare files, then stdin unless files were given
fn eval_all(st: &mut State, opts: Opts) -> io::Result<()> {
	let io = &mut stdio!();
	if let Some(expr) = opts.expr {
		exec_str(st, io, &expr)?;
		return Ok(());
	}
	if let Some(file) = opts.file {
		if exec_file(st, io, &file).map_err(|e| with_path(&file, e))? == Status::Quit {return Ok(());}
	}
	if !opts.files.is_empty() {
		for file in opts.files {
			if exec_file(st, io, &file).map_err(|e| with_path(&file, e))? == Status::Quit {break;}
		}
		return Ok(());
	}
	exec(st, io, &mut BufReader::new(std::io::stdin()))?;
	Ok(())
}

fn with_path(path: &Path, err: io::Error) -> io::Error {
	io::Error::new(err.kind(), format!("{}: {err}", path.display()))
}
