//! Shared test utilities for sdport tests.
//!
//! Build tools are replaced by shell scripts written into a temporary `bin/`
//! directory. The fake meson appends each invocation to a log file so tests
//! can assert which steps ran.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use sdport::config::Config;
use sdport::formula::{Dependency, Formula};

/// Test environment with temporary tool, source and prefix directories.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Only entry on the tool search path
    pub bin_dir: PathBuf,
    /// Stand-in for coreutils' gnubin
    pub gnubin: PathBuf,
    /// Unpacked source tree root
    pub source_dir: PathBuf,
    /// Install prefix
    pub prefix: PathBuf,
    /// One line per fake meson invocation
    pub meson_log: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let bin_dir = base.join("bin");
        let gnubin = base.join("gnubin");
        let source_dir = base.join("systemd-port");
        let prefix = base.join("prefix");
        let meson_log = base.join("meson.log");

        fs::create_dir_all(&bin_dir).expect("Failed to create bin dir");
        fs::create_dir_all(&gnubin).expect("Failed to create gnubin dir");
        fs::create_dir_all(source_dir.join("macos-homebrew")).expect("Failed to create source dir");

        Self {
            _temp_dir: temp_dir,
            bin_dir,
            gnubin,
            source_dir,
            prefix,
            meson_log,
        }
    }

    /// Config pointing every lookup into this environment.
    pub fn config(&self) -> Config {
        let vars: HashMap<String, String> = [
            ("PATH", self.bin_dir.display().to_string()),
            ("SDPORT_GNUBIN", self.gnubin.display().to_string()),
            ("SDPORT_SOURCE_DIR", self.source_dir.display().to_string()),
            ("SDPORT_PREFIX", self.prefix.display().to_string()),
            ("CC", "test-cc".to_string()),
            ("CXX", "test-c++".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Config::from_vars(&vars, self._temp_dir.path())
    }

    /// libsystemd formula with the given binaries as its only dependencies
    /// and no host requirement.
    pub fn formula(&self, config: &Config, deps: &[&str]) -> Formula {
        let mut formula = Formula::libsystemd();
        formula.requirements.clear();
        formula.dependencies = deps.iter().map(|d| Dependency::binary(d, d)).collect();
        config.apply(formula)
    }

    /// Create no-op executables for each name.
    pub fn provide(&self, names: &[&str]) {
        for name in names {
            create_mock_binary(&self.bin_dir.join(name), "exit 0");
        }
    }

    /// Install a fake meson with the given per-step behavior.
    pub fn fake_meson(&self, behavior: MesonBehavior) {
        self.fake_meson_at(&self.bin_dir.join("meson"), behavior);
    }

    /// Write the fake meson to an arbitrary location.
    pub fn fake_meson_at(&self, path: &Path, behavior: MesonBehavior) {
        let log = self.meson_log.display();
        let prefix = self.prefix.display();
        let install_lib = if behavior.create_lib {
            format!(
                "/bin/mkdir -p {prefix}/lib && echo lib > {prefix}/lib/libsystemd.0.dylib"
            )
        } else {
            ":".to_string()
        };

        let body = format!(
            r#"echo "$*" >> {log}
case "$1" in
  setup)
    echo "CC=$CC CXX=$CXX PATH=$PATH" > {log}.env
    /bin/mkdir -p build/meson-private
    [ {setup} -ne 0 ] && echo "meson.build:1:0: ERROR: Dependency libmount not found" >&2
    exit {setup}
    ;;
  compile)
    if [ {compile} -ne 0 ]; then
      echo "FAILED: src/libsystemd/sd-journal/journal-send.c.o"
      echo "../src/libsystemd/sd-journal/journal-send.c:42:5: error: use of undeclared identifier 'MSG_NOSIGNAL'"
      echo "ninja: build stopped: subcommand failed." >&2
    fi
    exit {compile}
    ;;
  install)
    {install_lib}
    exit {install}
    ;;
esac
exit 64"#,
            setup = behavior.setup_exit,
            compile = behavior.compile_exit,
            install = behavior.install_exit,
        );
        create_mock_binary(path, &body);
    }

    /// Logged meson invocations, one per line.
    pub fn meson_calls(&self) -> Vec<String> {
        fs::read_to_string(&self.meson_log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Environment seen by `meson setup`.
    pub fn setup_env(&self) -> String {
        fs::read_to_string(format!("{}.env", self.meson_log.display())).unwrap_or_default()
    }

    /// Relative paths of regular files under the prefix.
    pub fn installed_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = walkdir::WalkDir::new(&self.prefix)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(&self.prefix).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }
}

/// Exit codes and side effects of the fake meson.
#[derive(Debug, Clone, Copy)]
pub struct MesonBehavior {
    pub setup_exit: i32,
    pub compile_exit: i32,
    pub install_exit: i32,
    /// Whether `meson install` creates `<prefix>/lib`
    pub create_lib: bool,
}

impl Default for MesonBehavior {
    fn default() -> Self {
        Self {
            setup_exit: 0,
            compile_exit: 0,
            install_exit: 0,
            create_lib: true,
        }
    }
}

/// Create an executable shell script.
pub fn create_mock_binary(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir for binary");
    }
    fs::write(path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to create mock binary");

    let mut perms = fs::metadata(path).expect("Failed to get metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("Failed to set permissions");
}

/// Serve one HTTP response on a loopback port and return the base URL.
///
/// `content_length` lets a test advertise more bytes than it sends.
pub fn serve_once(body: Vec<u8>, content_length: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get test server address");

    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            content_length
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&body);
    });

    format!("http://{}", addr)
}

/// A loopback URL nothing listens on.
pub fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");
    format!("http://{}", addr)
}

/// Pack `<dir>/systemd-port-0.1.0/macos-homebrew/meson.build` into a tarball.
/// Returns the archive bytes.
pub fn source_tarball(dir: &Path) -> Vec<u8> {
    let tree = dir.join("systemd-port-0.1.0/macos-homebrew");
    fs::create_dir_all(&tree).expect("Failed to create tree");
    fs::write(tree.join("meson.build"), "project('systemd')\n").expect("Failed to write meson.build");

    let archive = dir.join("archive.tar.gz");
    let status = std::process::Command::new("tar")
        .arg("-czf")
        .arg(&archive)
        .arg("-C")
        .arg(dir)
        .arg("systemd-port-0.1.0")
        .status()
        .expect("Failed to run tar");
    assert!(status.success());
    fs::read(&archive).expect("Failed to read archive")
}
