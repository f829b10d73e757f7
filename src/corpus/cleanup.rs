use std::sync::LazyLock;

use regex::Regex;

use crate::record::Record;

static LATEX_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\.*?\{([^}]*)\}").expect("valid regex"));

static BRACED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]*)\}").expect("valid regex"));

/// Strip `\cmd{x}` down to `x`, then drop remaining `{x}` grouping braces.
pub fn strip_latex(s: &str) -> String {
    let without_commands = LATEX_COMMAND.replace_all(s, "$1");
    BRACED.replace_all(&without_commands, "$1").into_owned()
}

fn clean_person(name: String) -> String {
    if name.contains("ERROR") {
        String::new()
    } else {
        strip_latex(&name)
    }
}

/// Repair the artifacts bibliography exports leave behind.
pub fn sanitize(mut record: Record) -> Record {
    for link in record.url.iter_mut().chain(record.doi.iter_mut()) {
        link.retain(|c| c != '\\');
    }
    record.author = record.author.into_iter().map(clean_person).collect();
    record.editor = record.editor.into_iter().map(clean_person).collect();
    record.title = strip_latex(&record.title);
    record
}
