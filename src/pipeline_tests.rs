//! End-to-end tests for the bundle pipeline.
//!
//! Each test builds a throwaway source tree and runs the whole orchestrator
//! against it.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::config::{BundleConfig, OptimizeMode};
    use crate::error::{BundleError, ModuleWarning};
    use crate::optimize::Minifier;
    use crate::pipeline::Bundler;
    use crate::scanner::strip_comments;
    use crate::whitespace::normalize;

    const META: &str = "// ==UserScript==\n// @name fixture\n// @match https://example.org/*\n// ==/UserScript==\n";

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("src")).unwrap();
            Fixture { dir }
        }

        fn root(&self) -> PathBuf {
            self.dir.path().join("src")
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("dist").join("out.user.js")
        }

        fn write(&self, rel: &str, text: &str) -> &Self {
            let path = self.root().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
            self
        }

        fn config(&self) -> BundleConfig {
            BundleConfig {
                source_root: self.root(),
                output: self.output(),
                cache_file: Some(self.dir.path().join("cache.json")),
                ..BundleConfig::default()
            }
        }

        fn read_output(&self) -> String {
            fs::read_to_string(self.output()).unwrap()
        }
    }

    fn section_order(artifact: &str) -> Vec<String> {
        artifact
            .lines()
            .filter_map(|l| l.strip_prefix("// ---- module: "))
            .map(|l| l.trim_end_matches(" ----").to_string())
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ORDERING
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_manifest_ordering_with_unlisted_module() {
        let fx = Fixture::new();
        fx.write("a.js", "var a = 1;")
            .write("b.js", "var b = 2;")
            .write("c.js", "var c = 3;")
            .write("order.json", r#"["b.js", "a.js"]"#);

        let summary = Bundler::new(fx.config()).run().unwrap();

        assert_eq!(section_order(&fx.read_output()), vec!["b.js", "a.js", "c.js"]);
        assert_eq!(summary.merged, 3);
        assert!(summary.warnings.contains(&ModuleWarning::Unlisted {
            identifier: "c.js".to_string()
        }));
    }

    #[test]
    fn test_default_ordering_entry_first() {
        let fx = Fixture::new();
        fx.write("zeta.js", "var z;")
            .write("main.js", "var m;")
            .write("lib/alpha.js", "var a;");

        Bundler::new(fx.config()).run().unwrap();
        assert_eq!(
            section_order(&fx.read_output()),
            vec!["main.js", "alpha.js", "zeta.js"]
        );
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let fx = Fixture::new();
        fx.write("b.js", "var b;").write("a.js", "var a;");

        let first = Bundler::new(fx.config()).run().unwrap();
        let second = Bundler::new(fx.config()).run().unwrap();
        assert_eq!(first.digest, second.digest);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FATAL INPUT
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_empty_root_fails_without_output() {
        let fx = Fixture::new();
        fx.write("notes.txt", "nothing here");

        let result = Bundler::new(fx.config()).run();
        assert!(matches!(result, Err(BundleError::NoModules { .. })));
        assert!(!fx.output().exists());
    }

    #[test]
    fn test_all_modules_empty_fails_without_output() {
        let fx = Fixture::new();
        fx.write("a.js", "   \n").write("b.js", "");

        let result = Bundler::new(fx.config()).run();
        assert!(matches!(
            result,
            Err(BundleError::NoSurvivingModules { skipped: 2 })
        ));
        assert!(!fx.output().exists());
    }

    #[test]
    fn test_empty_module_is_skipped_and_counted() {
        let fx = Fixture::new();
        fx.write("a.js", "var a;").write("b.js", "\n\n");

        let summary = Bundler::new(fx.config()).run().unwrap();
        assert_eq!(summary.merged, 1);
        assert_eq!(summary.skipped, 1);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // HEADER
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_header_from_metadata_file_not_duplicated() {
        let fx = Fixture::new();
        fx.write("meta.js", META)
            .write("main.js", &format!("{}\nrun();\n", META));

        Bundler::new(fx.config()).run().unwrap();
        let out = fx.read_output();
        assert!(out.starts_with(META.trim_end()));
        assert_eq!(out.matches("==UserScript==").count(), 1);
        assert!(!section_order(&out).contains(&"meta.js".to_string()));
    }

    #[test]
    fn test_header_file_is_not_bundled() {
        let fx = Fixture::new();
        fx.write("header.js", META).write("main.js", "run();");

        let summary = Bundler::new(fx.config()).run().unwrap();
        let out = fx.read_output();
        assert!(out.starts_with(META.trim_end()));
        assert_eq!(section_order(&out), vec!["main.js"]);
        assert_eq!(summary.skipped, 0);
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn test_synthesized_header_when_none_found() {
        let fx = Fixture::new();
        fx.write("main.js", "run();");

        let mut config = fx.config();
        config.default_name = "fallback".to_string();
        Bundler::new(config).run().unwrap();

        let out = fx.read_output();
        assert!(out.starts_with("// ==UserScript==\n// @name         fallback"));
        assert!(out.ends_with("run();\n"));
        assert!(!out.ends_with("\n\n"));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // VALIDATION GATE
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unterminated_string_stops_before_optimize() {
        let fx = Fixture::new();
        fx.write("a.js", "// keep me\nvar ok = 1;")
            .write("b.js", "var broken = \"abc;\nvar after = 2;");

        let mut config = fx.config();
        config.optimize = OptimizeMode::Fast;
        let result = Bundler::new(config).run();

        let failure = match result {
            Err(BundleError::Validation(failure)) => failure,
            other => panic!("expected validation failure, got {:?}", other),
        };
        assert_eq!(failure.module.as_deref(), Some("b.js"));

        // pre-optimization artifact is left on disk, comments intact
        let out = fx.read_output();
        assert!(out.contains("// keep me"));
        assert!(!fx.dir.path().join("cache.json").exists());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CHANGE CACHE
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_change_counts_across_runs() {
        let fx = Fixture::new();
        fx.write("a.js", "var a;").write("b.js", "var b;");

        let first = Bundler::new(fx.config()).run().unwrap();
        assert_eq!(first.changed, 2);

        let second = Bundler::new(fx.config()).run().unwrap();
        assert_eq!(second.changed, 0);

        fx.write("b.js", "var b = 'longer now';");
        let third = Bundler::new(fx.config()).run().unwrap();
        assert_eq!(third.changed, 1);
    }

    #[test]
    fn test_corrupt_cache_counts_everything_changed() {
        let fx = Fixture::new();
        fx.write("a.js", "var a;");
        Bundler::new(fx.config()).run().unwrap();

        fs::write(fx.dir.path().join("cache.json"), "garbage").unwrap();
        let summary = Bundler::new(fx.config()).run().unwrap();
        assert_eq!(summary.changed, 1);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // OPTIMIZE STAGES
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_fast_path_strips_comments_keeps_literals() {
        let fx = Fixture::new();
        fx.write("meta.js", META).write(
            "main.js",
            "/* banner\n   more banner */\nvar url = \"http://example.org/a//b\";  // site\nvar re = /\\/\\*x/g;\n",
        );

        let mut config = fx.config();
        config.optimize = OptimizeMode::Fast;
        config.debug_copy = true;
        let summary = Bundler::new(config.clone()).run().unwrap();

        let out = fx.read_output();
        assert!(out.starts_with(META.trim_end()));
        assert!(!out.contains("banner"));
        assert!(!out.contains("// site"));
        assert!(out.contains("var url = \"http://example.org/a//b\";"));
        assert!(out.contains("var re = /\\/\\*x/g;"));
        assert!(summary.bytes_final < summary.bytes_assembled);

        let debug = fs::read_to_string(config.debug_output_path()).unwrap();
        assert!(debug.contains("banner"));
    }

    struct FailingMinifier;

    impl Minifier for FailingMinifier {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn minify(&self, _source: &str) -> Result<String, String> {
            Err("minifier crashed".to_string())
        }
    }

    #[test]
    fn test_minifier_failure_keeps_assembled_artifact() {
        let fx = Fixture::new();
        fx.write("main.js", "// note\nrun();");

        let mut config = fx.config();
        config.optimize = OptimizeMode::Full;
        let result = Bundler::new(config)
            .with_minifier(Box::new(FailingMinifier))
            .run();

        assert!(matches!(
            result,
            Err(BundleError::ExternalStage { stage: "minify", .. })
        ));
        assert!(fx.read_output().contains("// note"));
    }

    #[test]
    fn test_full_path_with_oxc() {
        let fx = Fixture::new();
        fx.write("meta.js", META)
            .write("main.js", "function  greet(name) {\n  // say hi\n  return 'hi ' + name;\n}\ngreet('x');\n");

        let mut config = fx.config();
        config.optimize = OptimizeMode::Full;
        Bundler::new(config).run().unwrap();

        let out = fx.read_output();
        assert!(out.starts_with(META.trim_end()));
        assert!(!out.contains("say hi"));
        assert!(out.contains("greet"));
    }

    #[test]
    fn test_source_map_written_only_when_requested() {
        let fx = Fixture::new();
        fx.write("meta.js", META)
            .write("main.js", "function greet(name) {\n  return 'hi ' + name;\n}\ngreet('x');\n");

        let mut config = fx.config();
        config.optimize = OptimizeMode::Full;
        let map_path = config.source_map_path();

        let summary = Bundler::new(config.clone()).run().unwrap();
        assert_eq!(summary.source_map, None);
        assert!(!map_path.exists());
        assert!(!fx.read_output().contains("sourceMappingURL"));

        config.source_map = true;
        let summary = Bundler::new(config).run().unwrap();
        assert_eq!(summary.source_map.as_ref(), Some(&map_path));

        let map: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&map_path).unwrap()).unwrap();
        assert_eq!(map["version"], 3);
        assert!(map["mappings"].as_str().unwrap().starts_with(';'));

        let out = fx.read_output();
        assert!(out.starts_with(META.trim_end()));
        assert!(out.ends_with("//# sourceMappingURL=out.user.js.map\n"));
    }

    #[test]
    fn test_source_map_ignored_on_fast_path() {
        let fx = Fixture::new();
        fx.write("main.js", "run(); // note");

        let mut config = fx.config();
        config.optimize = OptimizeMode::Fast;
        config.source_map = true;
        let summary = Bundler::new(config.clone()).run().unwrap();

        assert_eq!(summary.source_map, None);
        assert!(!config.source_map_path().exists());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LINT
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_builtin_lint_rejects_debugger() {
        let fx = Fixture::new();
        fx.write("a.js", "var a;").write("b.js", "debugger;");

        let err = Bundler::new(fx.config()).run().unwrap_err();
        match err {
            BundleError::ExternalStage { stage, message } => {
                assert_eq!(stage, "lint");
                assert!(message.contains("b.js"));
            }
            other => panic!("expected lint failure, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_lint() {
        let fx = Fixture::new();
        fx.write("a.js", "debugger;");

        let mut config = fx.config();
        config.skip_lint = true;
        assert!(Bundler::new(config).run().is_ok());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SCANNER + NORMALIZER PROPERTIES
    // ═══════════════════════════════════════════════════════════════════════

    fn corpus() -> Vec<&'static str> {
        vec![
            "var s = \"a\\\"b\"; // c\n",
            "code(); // x\nmore();",
            "start(); /* one\ntwo\nthree */ end();",
            "if (a / b > 1) { return /[/]+\\s*/gi.test(s); } // tail",
            "  \tindent();\n\n\n\n\n   tail();   ",
            "var t = `x  //  y`; var u = 'p /* q */ r';",
        ]
    }

    #[test]
    fn test_scan_then_normalize_is_idempotent() {
        for source in corpus() {
            let once = normalize(&strip_comments(source));
            let twice = normalize(&strip_comments(&once));
            assert_eq!(once, twice, "not idempotent for {:?}", source);
        }
    }

    #[test]
    fn test_multiline_block_comment_drops_inner_lines() {
        let out = strip_comments("start(); /* one\ntwo\nthree */ end();");
        assert_eq!(out, "start(); \n end();");
    }
}
