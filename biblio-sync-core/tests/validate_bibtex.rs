use biblio_sync_core::contract::{BibFile, ValidationError, Validator};
use biblio_sync_core::validate::BibtexValidator;

fn check(text: &str) -> Result<usize, ValidationError> {
    let file = BibFile {
        path: "test.bib".into(),
        content: text.as_bytes().to_vec(),
    };
    BibtexValidator::new().validate(&file).map(|s| s.entries)
}

fn syntax_line(err: ValidationError) -> usize {
    match err {
        ValidationError::Syntax { line, .. } => line,
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn accepts_well_formed_entries() {
    let text = r#"
% Papers from 2020
@string{ usenix = "USENIX Association" }

@inproceedings{foo2020,
  author    = {Alice Example and Bob {McExample}},
  title     = "A {Study} of Things",
  booktitle = usenix # " Security",
  year      = 2020,
}

@article(bar2021,
  title = {Parenthesised entry},
  year = "2021"
)

@misc{keyonly}
@comment{ anything { nested } goes }
@preamble{ "\newcommand{\noop}[1]{}" }
"#;
    assert_eq!(check(text), Ok(3));
}

#[test]
fn empty_and_comment_only_files_are_valid() {
    assert_eq!(check(""), Ok(0));
    assert_eq!(check("just some notes\nwithout entries\n"), Ok(0));
}

#[test]
fn rejects_unclosed_field_brace() {
    let text = "@article{bar,\n  title = {Unbalanced,\n  year = 2021\n";
    let err = check(text).unwrap_err();
    assert_eq!(syntax_line(err), 2);

    // The brace closes the field instead of the entry.
    let text = "@article{bar,\n  title = {Unbalanced,\n  year = 2021\n}\n";
    assert!(check(text).is_err());
}

#[test]
fn rejects_missing_entry_close() {
    let text = "@article{bar,\n  title = {Fine}\n";
    let err = check(text).unwrap_err();
    assert!(err.to_string().contains("closing"), "got: {err}");
}

#[test]
fn rejects_mismatched_delimiters() {
    assert!(check("@article{bar, title = {x})").is_err());
    assert!(check("@article(bar, title = {x}}").is_err());
}

#[test]
fn rejects_missing_key_and_missing_equals() {
    assert!(check("@article{, title = {x}}").is_err());
    assert!(check("@article{bar, title {x}}").is_err());
    assert!(check("@article{title = {x}}").is_err());
}

#[test]
fn rejects_stray_closing_brace_in_quotes() {
    let err = check("@misc{a,\n note = \"oops}\"\n}").unwrap_err();
    assert_eq!(syntax_line(err), 2);
}

#[test]
fn rejects_dangling_at_sign() {
    assert!(check("contact me @ home").is_err());
    assert!(check("@article").is_err());
}

#[test]
fn accepts_latin1_content() {
    let file = BibFile {
        path: "latin1.bib".into(),
        content: b"@article{mueller2019,\n author = {M\xfcller},\n year = 2019\n}\n".to_vec(),
    };
    assert_eq!(BibtexValidator::new().validate(&file).map(|s| s.entries), Ok(1));
}

#[test]
fn citation_key_ends_only_at_whitespace_comma_or_close() {
    assert_eq!(check("@misc{smith(2020), note = {x}}"), Ok(1));
    assert_eq!(check("@misc{a=b#\"c\", note = {x}}"), Ok(1));
    assert_eq!(check("@misc(smith{2020}, note = {x})"), Ok(1));
    assert!(check("@misc{smith 2020, note = {x}}").is_err());
}
