use roxmltree::{Document, ParsingOptions};

/// Parse an XML document, accepting a `<!DOCTYPE>` declaration.
///
/// Module descriptors and older `web.xml` files carry one; external DTDs are
/// never fetched.
pub fn parse_document(text: &str) -> Result<Document<'_>, roxmltree::Error> {
    Document::parse_with_options(
        text,
        ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        },
    )
}
