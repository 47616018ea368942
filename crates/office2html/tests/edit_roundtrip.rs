//! The edit round trip: apply a text diff by document path, save the
//! package, and reopen it.

mod common;

use pretty_assertions::assert_eq;

use office2html::edit::EditDiff;
use office2html::{DecodedFile, HtmlOptions, OpenError};

use common::*;

fn styled_odt() -> Vec<u8> {
    build_odf(
        ODT_MIME,
        &[
            (
                "content.xml",
                &text_content_xml(&[
                    "zero", "one", "two", "three", "four", "five", "six", "seven",
                ]),
            ),
            ("styles.xml", &styles_xml("8.5in", "11in", "1in")),
            ("settings.xml", "<office:document-settings/>"),
        ],
    )
}

#[test]
fn edit_rewrites_only_the_addressed_element() {
    let decoded = office2html::open_bytes(styled_odt()).unwrap();
    let diff =
        EditDiff::parse(r#"{ "modifiedText": { "/child:6/child:0": "hello world!" } }"#).unwrap();
    let saved = office2html::edit_and_save(&decoded, &diff).unwrap();

    let reopened = office2html::open_bytes(saved).unwrap();
    let DecodedFile::Document(document) = &reopened else {
        panic!("expected a document after saving");
    };
    let tree = document.document().unwrap();
    let texts: Vec<String> = tree
        .registry
        .children(tree.root)
        .map(|paragraph| tree.element_text(paragraph))
        .collect();
    assert_eq!(
        texts,
        [
            "zero",
            "one",
            "two",
            "three",
            "four",
            "five",
            "hello world!",
            "seven"
        ]
    );
}

#[test]
fn saved_package_preserves_other_entries() {
    let decoded = office2html::open_bytes(styled_odt()).unwrap();
    let diff = EditDiff::parse(r#"{ "modifiedText": { "/child:0/child:0": "x" } }"#).unwrap();
    let saved = office2html::edit_and_save(&decoded, &diff).unwrap();

    let archive =
        office2html::archive::zip::read_archive(&office2html::vfs::File::from_bytes(saved))
            .unwrap();
    // entry order intact, mimetype first
    let order: Vec<String> = archive.entries().map(|e| e.path.to_string()).collect();
    assert_eq!(
        order,
        ["/mimetype", "/content.xml", "/styles.xml", "/settings.xml"]
    );
    let settings = archive
        .find(&office2html::vfs::Path::new("/settings.xml").unwrap())
        .unwrap();
    assert_eq!(
        settings.file.as_ref().unwrap().bytes().unwrap().as_slice(),
        b"<office:document-settings/>"
    );
}

#[test]
fn edited_text_is_visible_in_translation() {
    let decoded = office2html::open_bytes(styled_odt()).unwrap();
    let diff =
        EditDiff::parse(r#"{ "modifiedText": { "/child:6/child:0": "hello world!" } }"#).unwrap();
    let saved = office2html::edit_and_save(&decoded, &diff).unwrap();

    let reopened = office2html::open_bytes(saved).unwrap();
    let output = office2html::translate(&reopened, &HtmlOptions::default()).unwrap();
    assert!(output.pages[0].html.contains("hello world!"));
    assert!(!output.pages[0].html.contains("six"));
}

#[test]
fn editable_translation_paths_resolve_back() {
    let decoded = office2html::open_bytes(styled_odt()).unwrap();
    let options = HtmlOptions {
        editable: true,
        ..Default::default()
    };
    let output = office2html::translate(&decoded, &options).unwrap();
    // the paths emitted into data-path attributes are exactly the ones a
    // diff may address
    assert!(output.pages[0].html.contains(r#"data-path="/child:6/child:0""#));
}

#[test]
fn bad_paths_and_wrong_targets_error() {
    let decoded = office2html::open_bytes(styled_odt()).unwrap();

    let diff = EditDiff::parse(r#"{ "modifiedText": { "/child:99": "x" } }"#).unwrap();
    assert!(matches!(
        office2html::edit_and_save(&decoded, &diff),
        Err(OpenError::InvalidPath(_))
    ));

    let diff = EditDiff::parse(r#"{ "modifiedText": { "child without slash": "x" } }"#).unwrap();
    assert!(office2html::edit_and_save(&decoded, &diff).is_err());

    // editing a non-document is unsupported
    let text = office2html::open_bytes(b"plain".to_vec()).unwrap();
    let diff = EditDiff::default();
    assert!(matches!(
        office2html::edit_and_save(&text, &diff),
        Err(OpenError::UnsupportedOperation)
    ));
}
