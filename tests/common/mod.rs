use anyhow::Result;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

/// A canned response for requests whose path starts with `prefix`.
pub struct Route {
    pub prefix: &'static str,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn ok(prefix: &'static str, body: &str) -> Self {
        Self {
            prefix,
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(prefix: &'static str, status: u16) -> Self {
        Self {
            prefix,
            status,
            body: format!("{{\"message\": \"stub status {}\"}}", status),
        }
    }
}

/// Start a throwaway catalog on a random local port and return its base URL.
pub fn start_catalog(routes: Vec<Route>) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let Ok(clone) = stream.try_clone() else { continue };
            let mut reader = BufReader::new(clone);

            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or("/");
            let (status, body) = routes
                .iter()
                .find(|route| path.starts_with(route.prefix))
                .map(|route| (route.status, route.body.clone()))
                .unwrap_or((404, "{}".to_string()));

            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    Ok(format!("http://{}", addr))
}

pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        fs::create_dir_all(temp_dir.path().join("book"))?;
        fs::create_dir_all(temp_dir.path().join("bin"))?;
        Ok(Self { temp_dir })
    }

    /// Folder holding the audiobook files.
    pub fn book_dir(&self) -> PathBuf {
        self.temp_dir.path().join("book")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.toml")
    }

    pub fn add_parts(&self, names: &[&str]) -> Result<()> {
        for name in names {
            fs::write(self.book_dir().join(name), format!("audio data of {}", name))?;
        }
        Ok(())
    }

    /// Write stub ffmpeg/ffprobe scripts and a config pointing at them and
    /// at `catalog_url`.
    pub fn configure(&self, catalog_url: &str, probe_secs: f64) -> Result<()> {
        let ffprobe = self.write_script("ffprobe", &format!("echo {:.1}\n", probe_secs))?;
        // ffmpeg's output path is always the last argument
        let ffmpeg = self.write_script(
            "ffmpeg",
            "for last; do :; done\nprintf 'ID3-less audio payload' > \"$last\"\n",
        )?;

        let config = format!(
            "api_base_url = \"{}\"\nrequest_retries = 0\nretry_backoff_ms = 1\nrequest_timeout_secs = 5\nffmpeg_bin = \"{}\"\nffprobe_bin = \"{}\"\n",
            catalog_url,
            ffmpeg.display(),
            ffprobe.display()
        );
        fs::write(self.config_path(), config)?;
        Ok(())
    }

    fn write_script(&self, name: &str, body: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }
        Ok(path)
    }

    pub fn book_files(&self) -> Result<Vec<String>> {
        list_files(&self.book_dir())
    }
}

pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
