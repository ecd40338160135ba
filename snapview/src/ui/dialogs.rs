use std::io::{self, BufRead, Write};

/// Ask a yes/no question on the terminal; anything but yes means no
pub fn confirm(question: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    confirm_with(&mut stdin.lock(), &mut stderr, question)
}

pub fn confirm_with<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    write!(output, "{question} [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

pub fn delete_question(name: &str) -> String {
    format!("Really delete snapshot '{name}'?")
}

pub fn remove_file_question(full_path: &str) -> String {
    format!("Do you want to delete the file\n\n{full_path}\n\nfrom current system?")
}

pub fn copy_file_question(full_path: &str, num: u32) -> String {
    format!("Do you want to copy the file\n\n{full_path}\n\nfrom snapshot '{num}' to current system?")
}

/// Question shown before restoring several files at once
pub fn restore_files_question(num: u32, full_paths: &[String]) -> String {
    format!(
        "These files will be restored from snapshot '{num}':\n\n{}\n\n\
         Files existing in original snapshot will be copied to current system.\n\
         Files that did not exist in the snapshot will be deleted.\n\
         Are you sure?",
        full_paths.join("\n")
    )
}

/// Show an info message
pub fn show_info(message: &str) {
    println!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_answers() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("\n", false), ("", false)] {
            let mut input = answer.as_bytes();
            let mut output = Vec::new();
            assert_eq!(
                confirm_with(&mut input, &mut output, "Go?").unwrap(),
                expected,
                "answer {answer:?}"
            );
            assert_eq!(String::from_utf8(output).unwrap(), "Go? [y/N] ");
        }
    }

    #[test]
    fn test_questions() {
        assert_eq!(delete_question("3 - 4"), "Really delete snapshot '3 - 4'?");
        assert!(copy_file_question("/etc/motd", 5).contains("from snapshot '5' to current system?"));
        assert!(remove_file_question("/etc/new").starts_with("Do you want to delete the file\n\n/etc/new"));

        let question = restore_files_question(2, &["/a".to_string(), "/b".to_string()]);
        assert!(question.starts_with("These files will be restored from snapshot '2':\n\n/a\n/b\n"));
        assert!(question.ends_with("Are you sure?"));
    }
}
