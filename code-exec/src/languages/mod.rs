//! Language registry: how each supported language becomes process invocations

mod java;

pub use java::public_class_name;

use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use which::which;

/// One element of an invocation template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Passed through verbatim
    Lit(&'static str),
    /// The staged source file
    Source,
    /// Whatever the compile phase produced: a binary path, or a class name
    Artifact,
}

/// Ordered command + argument template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub program: Token,
    pub args: &'static [Token],
}

/// Concrete values substituted into an [`Invocation`]
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    pub source: &'a Path,
    pub artifact: &'a OsStr,
}

impl Invocation {
    pub const fn new(program: Token, args: &'static [Token]) -> Self {
        Self { program, args }
    }

    /// Substitute placeholders, producing the program and its arguments
    pub fn render(&self, bindings: &Bindings<'_>) -> (OsString, Vec<OsString>) {
        let resolve = |token: &Token| -> OsString {
            match token {
                Token::Lit(s) => OsString::from(*s),
                Token::Source => bindings.source.as_os_str().to_owned(),
                Token::Artifact => bindings.artifact.to_owned(),
            }
        };
        (
            resolve(&self.program),
            self.args.iter().map(resolve).collect(),
        )
    }

    /// Name of the external tool this invocation launches, if it is one
    pub fn tool(&self) -> Option<&'static str> {
        match self.program {
            Token::Lit(name) => Some(name),
            Token::Source | Token::Artifact => None,
        }
    }
}

/// Extracts the derived program name from source text
pub type EntryPointFn = fn(&str) -> Option<&str>;

/// How a language is realised as one or two process runs
#[derive(Debug, Clone, Copy)]
pub enum ExecutionMode {
    /// A single run of an interpreter (or `go run` style driver) over the source
    Interpret { run: Invocation },
    /// Compile to a fixed-name artifact in the workspace, then run it
    CompileThenRun { compile: Invocation, run: Invocation },
    /// The source file must be named after an identifier found in the source,
    /// and the run step launches that identifier rather than a path
    CompileThenRunWithDerivedName {
        compile: Invocation,
        run: Invocation,
        entry_point: EntryPointFn,
    },
}

impl ExecutionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Interpret { .. } => "interpret",
            ExecutionMode::CompileThenRun { .. } => "compile_then_run",
            ExecutionMode::CompileThenRunWithDerivedName { .. } => {
                "compile_then_run_with_derived_name"
            }
        }
    }

    pub fn compile(&self) -> Option<&Invocation> {
        match self {
            ExecutionMode::Interpret { .. } => None,
            ExecutionMode::CompileThenRun { compile, .. }
            | ExecutionMode::CompileThenRunWithDerivedName { compile, .. } => Some(compile),
        }
    }

    pub fn run(&self) -> &Invocation {
        match self {
            ExecutionMode::Interpret { run }
            | ExecutionMode::CompileThenRun { run, .. }
            | ExecutionMode::CompileThenRunWithDerivedName { run, .. } => run,
        }
    }
}

/// Registry entry for one language
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    /// Canonical lowercase identifier
    pub id: &'static str,
    /// Human-readable name used in messages
    pub display_name: &'static str,
    /// Source file suffix, without the dot
    pub extension: &'static str,
    pub mode: ExecutionMode,
}

pub trait ToolCheck {
    fn required_tools(&self) -> Vec<&'static str>;

    fn missing_tools(&self) -> Vec<&'static str> {
        self.required_tools()
            .into_iter()
            .filter(|tool| which(tool).is_err())
            .collect()
    }

    fn tools_available(&self) -> bool {
        self.missing_tools().is_empty()
    }
}

impl ToolCheck for LanguageProfile {
    /// Every external command this profile needs on `PATH`
    fn required_tools(&self) -> Vec<&'static str> {
        self.mode
            .compile()
            .into_iter()
            .chain(std::iter::once(self.mode.run()))
            .filter_map(Invocation::tool)
            .collect()
    }
}

const fn interpreted(
    id: &'static str,
    display_name: &'static str,
    extension: &'static str,
    run: Invocation,
) -> LanguageProfile {
    LanguageProfile {
        id,
        display_name,
        extension,
        mode: ExecutionMode::Interpret { run },
    }
}

const fn native(
    id: &'static str,
    display_name: &'static str,
    extension: &'static str,
    compile: Invocation,
) -> LanguageProfile {
    LanguageProfile {
        id,
        display_name,
        extension,
        mode: ExecutionMode::CompileThenRun {
            compile,
            run: Invocation::new(Token::Artifact, &[]),
        },
    }
}

static JAVASCRIPT: LanguageProfile = interpreted(
    "javascript",
    "JavaScript",
    "js",
    Invocation::new(Token::Lit("node"), &[Token::Source]),
);
static PYTHON: LanguageProfile = interpreted(
    "python",
    "Python",
    "py",
    Invocation::new(Token::Lit("python3"), &[Token::Source]),
);
static JAVA: LanguageProfile = LanguageProfile {
    id: "java",
    display_name: "Java",
    extension: "java",
    mode: ExecutionMode::CompileThenRunWithDerivedName {
        compile: Invocation::new(Token::Lit("javac"), &[Token::Source]),
        run: Invocation::new(Token::Lit("java"), &[Token::Artifact]),
        entry_point: public_class_name,
    },
};
static CPP: LanguageProfile = native(
    "cpp",
    "C++",
    "cpp",
    Invocation::new(
        Token::Lit("g++"),
        &[Token::Lit("-o"), Token::Artifact, Token::Source],
    ),
);
static C: LanguageProfile = native(
    "c",
    "C",
    "c",
    Invocation::new(
        Token::Lit("gcc"),
        &[Token::Lit("-o"), Token::Artifact, Token::Source],
    ),
);
static RUBY: LanguageProfile = interpreted(
    "ruby",
    "Ruby",
    "rb",
    Invocation::new(Token::Lit("ruby"), &[Token::Source]),
);
static GO: LanguageProfile = interpreted(
    "go",
    "Go",
    "go",
    Invocation::new(Token::Lit("go"), &[Token::Lit("run"), Token::Source]),
);
static PHP: LanguageProfile = interpreted(
    "php",
    "PHP",
    "php",
    Invocation::new(Token::Lit("php"), &[Token::Source]),
);
static BASH: LanguageProfile = interpreted(
    "bash",
    "Bash",
    "sh",
    Invocation::new(Token::Lit("bash"), &[Token::Source]),
);
static PERL: LanguageProfile = interpreted(
    "perl",
    "Perl",
    "pl",
    Invocation::new(Token::Lit("perl"), &[Token::Source]),
);
static RUST: LanguageProfile = native(
    "rust",
    "Rust",
    "rs",
    Invocation::new(
        Token::Lit("rustc"),
        &[Token::Lit("-o"), Token::Artifact, Token::Source],
    ),
);

/// Supported programming languages, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Java,
    Cpp,
    C,
    Ruby,
    Go,
    Php,
    Bash,
    Perl,
    Rust,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::JavaScript,
        Language::Python,
        Language::Java,
        Language::Cpp,
        Language::C,
        Language::Ruby,
        Language::Go,
        Language::Php,
        Language::Bash,
        Language::Perl,
        Language::Rust,
    ];

    pub fn profile(self) -> &'static LanguageProfile {
        match self {
            Language::JavaScript => &JAVASCRIPT,
            Language::Python => &PYTHON,
            Language::Java => &JAVA,
            Language::Cpp => &CPP,
            Language::C => &C,
            Language::Ruby => &RUBY,
            Language::Go => &GO,
            Language::Php => &PHP,
            Language::Bash => &BASH,
            Language::Perl => &PERL,
            Language::Rust => &RUST,
        }
    }

    pub fn id(self) -> &'static str {
        self.profile().id
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| unsupported_message(s))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Case-insensitive registry lookup
pub fn lookup(language_id: &str) -> Option<&'static LanguageProfile> {
    language_id.parse::<Language>().ok().map(Language::profile)
}

/// Registered identifiers in registry order
pub fn supported_ids() -> Vec<&'static str> {
    Language::ALL.into_iter().map(Language::id).collect()
}

/// Error text for an unknown identifier; lists everything that is supported
pub fn unsupported_message(language_id: &str) -> String {
    format!(
        "Language '{}' is not supported.\nSupported: {}",
        language_id.to_lowercase(),
        supported_ids().join(", ")
    )
}

/// Whether each registered language's toolchain is installed on this host
pub fn toolchain_status() -> Vec<(&'static LanguageProfile, bool)> {
    Language::ALL
        .into_iter()
        .map(|language| {
            let profile = language.profile();
            (profile, profile.tools_available())
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which(**tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
