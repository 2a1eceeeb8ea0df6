//! Static language → file extension table.
//!
//! Editors describe their content in different vocabularies: Ace uses mode
//! paths (`ace/mode/javascript`), Monaco uses language ids (`typescript`),
//! CodeMirror 5 uses mode names or MIME types (`text/x-rustsrc`). All of them
//! are normalized to a lowercase name and looked up here.

const TABLE: &[(&str, &str)] = &[
    ("abap", "abap"),
    ("asciidoc", "adoc"),
    ("bat", "bat"),
    ("batchfile", "bat"),
    ("c", "c"),
    ("c_cpp", "cpp"),
    ("clojure", "clj"),
    ("cmake", "cmake"),
    ("coffee", "coffee"),
    ("coffeescript", "coffee"),
    ("cpp", "cpp"),
    ("c++src", "cpp"),
    ("csharp", "cs"),
    ("csrc", "c"),
    ("css", "css"),
    ("d", "d"),
    ("dart", "dart"),
    ("diff", "diff"),
    ("dockerfile", "dockerfile"),
    ("elixir", "ex"),
    ("elm", "elm"),
    ("erlang", "erl"),
    ("fortran", "f90"),
    ("fsharp", "fs"),
    ("gfm", "md"),
    ("go", "go"),
    ("golang", "go"),
    ("graphql", "graphql"),
    ("groovy", "groovy"),
    ("haskell", "hs"),
    ("haml", "haml"),
    ("html", "html"),
    ("htmlmixed", "html"),
    ("ini", "ini"),
    ("java", "java"),
    ("javascript", "js"),
    ("jsx", "jsx"),
    ("json", "json"),
    ("julia", "jl"),
    ("kotlin", "kt"),
    ("latex", "tex"),
    ("less", "less"),
    ("lisp", "lisp"),
    ("lua", "lua"),
    ("makefile", "mk"),
    ("markdown", "md"),
    ("matlab", "m"),
    ("nix", "nix"),
    ("objectivec", "m"),
    ("ocaml", "ml"),
    ("pascal", "pas"),
    ("perl", "pl"),
    ("php", "php"),
    ("plaintext", "txt"),
    ("plain_text", "txt"),
    ("powershell", "ps1"),
    ("python", "py"),
    ("r", "r"),
    ("ruby", "rb"),
    ("rust", "rs"),
    ("rustsrc", "rs"),
    ("sass", "sass"),
    ("scala", "scala"),
    ("scheme", "scm"),
    ("scss", "scss"),
    ("sh", "sh"),
    ("shell", "sh"),
    ("sql", "sql"),
    ("stex", "tex"),
    ("swift", "swift"),
    ("tex", "tex"),
    ("text", "txt"),
    ("toml", "toml"),
    ("tsx", "tsx"),
    ("typescript", "ts"),
    ("vb", "vb"),
    ("verilog", "v"),
    ("vim", "vim"),
    ("vue", "vue"),
    ("xml", "xml"),
    ("yaml", "yaml"),
    ("zig", "zig"),
];

fn normalize(language: &str) -> String {
    let lower = language.trim().to_ascii_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    name.strip_prefix("x-").unwrap_or(name).to_string()
}

/// File extension for an editor language/mode identifier.
pub fn extension_for(language: &str) -> Option<&'static str> {
    let name = normalize(language);
    if name.is_empty() {
        return None;
    }
    TABLE.iter().find(|(lang, _)| *lang == name).map(|(_, ext)| *ext)
}
