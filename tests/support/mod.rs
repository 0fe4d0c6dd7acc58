//! Shared fixtures: a small GWT project, an offline repository holding the
//! GWT jars, and a stand-in `java` that is really `/bin/sh <script>`.

#![allow(dead_code)]

use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const GWT_VERSION: &str = "2.0.0";

pub const APP_MODULE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module rename-to="app">
  <inherits name="com.google.gwt.user.User"/>
  <inherits name="com.example.Shared"/>
  <entry-point class="com.example.client.App"/>
  <servlet path="/greet" class="com.example.server.GreetingServiceImpl"/>
</module>
"#;

pub const SHARED_MODULE: &str = r#"<module>
  <source path="shared"/>
  <servlet path="/rpc" class="com.example.RpcServlet"/>
</module>
"#;

pub const WEB_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<web-app>
  <display-name>app</display-name>
  <welcome-file-list>
    <welcome-file>index.html</welcome-file>
  </welcome-file-list>
</web-app>
"#;

pub struct GwtProject {
    pub temp: TempDir,
}

impl GwtProject {
    /// Project with `com.example.App` (application) and `com.example.Shared` (library)
    pub fn new() -> Self {
        let project = Self {
            temp: TempDir::new().expect("Failed to create temp dir"),
        };
        project.write("pom.xml", &pom());
        project.write("src/main/java/com/example/App.gwt.xml", APP_MODULE);
        project.write("src/main/java/com/example/Shared.gwt.xml", SHARED_MODULE);
        project.write(
            "src/main/java/com/example/client/App.java",
            "package com.example.client;\npublic class App {}\n",
        );
        project.write("src/main/webapp/WEB-INF/web.xml", WEB_XML);
        project.seed_repository();
        project.age_sources();
        project
    }

    pub fn dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn repository(&self) -> PathBuf {
        self.dir().join("m2")
    }

    pub fn war(&self) -> PathBuf {
        self.dir().join("target/app-1.0")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().expect("No parent")).expect("Failed to create dirs");
        fs::write(&path, content).expect("Failed to write file");
    }

    fn seed_repository(&self) {
        for artifact in ["gwt-user", "gwt-dev"] {
            let dir = self
                .repository()
                .join("com/google/gwt")
                .join(artifact)
                .join(GWT_VERSION);
            fs::create_dir_all(&dir).expect("Failed to create repository dir");
            fs::write(dir.join(format!("{}-{}.jar", artifact, GWT_VERSION)), b"PK")
                .expect("Failed to write jar");
        }
    }

    /// Push every source file an hour into the past so compiled output is newer
    pub fn age_sources(&self) {
        let past = FileTime::from_unix_time(FileTime::now().unix_seconds() - 3600, 0);
        for entry in walk(&self.path("src")) {
            set_file_mtime(&entry, past).expect("Failed to set mtime");
        }
    }

    /// Write `gwtpipe.toml` pointing at the offline repository and the fake java `script`
    pub fn configure(&self, script: &str, extra: &str) {
        let script_path = self.path("fake-java.sh");
        fs::write(&script_path, script).expect("Failed to write script");
        let config = format!(
            "offline = true\nlocal-repository = \"{}\"\njava = \"/bin/sh\"\njvm-args = [\"{}\"]\n{}",
            self.repository().display(),
            script_path.display(),
            extra
        );
        fs::write(self.path("gwtpipe.toml"), config).expect("Failed to write gwtpipe.toml");
    }
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walk(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

fn pom() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>app</artifactId>
  <version>1.0</version>
  <packaging>war</packaging>
  <properties>
    <gwt.version>{}</gwt.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>com.google.gwt</groupId>
      <artifactId>gwt-user</artifactId>
      <version>${{gwt.version}}</version>
      <scope>provided</scope>
    </dependency>
  </dependencies>
</project>
"#,
        GWT_VERSION
    )
}

/// A compiler stand-in: records its arguments in `args.log` and writes
/// `<war>/app/app.nocache.js`
pub fn fake_compiler(log: &Path) -> String {
    format!(
        r#"prev=""
out=""
for a in "$@"; do
  if [ "$prev" = "-war" ] || [ "$prev" = "-out" ]; then out="$a"; fi
  prev="$a"
done
echo "$@" >> "{}"
mkdir -p "$out/app"
echo "// compiled" > "$out/app/app.nocache.js"
echo "Compilation succeeded"
"#,
        log.display()
    )
}
