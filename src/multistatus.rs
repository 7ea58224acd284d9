//! Multistatus (207) and lock discovery XML bodies.
//!
//! Only what the engine emits is supported here: a flat multistatus with
//! one `propstat` per response, and the `lockdiscovery` document.
use bytes::Bytes;
use http::StatusCode;
use xml::writer::{EventWriter, XmlEvent as XmlWEvent};
use xml::EmitterConfig;

use crate::davpath::DavPath;
use crate::fs::DavMetaData;
use crate::ls::LockScope;
use crate::util::{status_line, systemtime_to_httpdate, systemtime_to_rfc3339, MemBuffer};
use crate::DavResult;

pub(crate) const NS_DAV_URI: &str = "DAV:";
// datatypes namespace, used for the dateTime.tz attribute.
pub(crate) const NS_DATATYPES_URI: &str = "urn:uuid:c2f41010-65b3-11d1-a29f-00aa00c14882/";
pub(crate) const NS_MS_URI: &str = "urn:schemas-microsoft-com:";

pub(crate) struct XmlBuilder {
    w: EventWriter<MemBuffer>,
}

impl XmlBuilder {
    pub(crate) fn new() -> XmlBuilder {
        let w = EmitterConfig::new()
            .perform_indent(false)
            .write_document_declaration(true)
            .create_writer(MemBuffer::new());
        XmlBuilder { w }
    }

    /// Root element; declares the D:, b: and Z: prefixes.
    pub(crate) fn root(&mut self, name: &str) -> DavResult<()> {
        self.w.write(
            XmlWEvent::start_element(name)
                .ns("D", NS_DAV_URI)
                .ns("b", NS_DATATYPES_URI)
                .ns("Z", NS_MS_URI),
        )?;
        Ok(())
    }

    pub(crate) fn start(&mut self, name: &str) -> DavResult<()> {
        self.w.write(XmlWEvent::start_element(name))?;
        Ok(())
    }

    pub(crate) fn end(&mut self) -> DavResult<()> {
        self.w.write(XmlWEvent::end_element())?;
        Ok(())
    }

    /// `<name/>`
    pub(crate) fn empty(&mut self, name: &str) -> DavResult<()> {
        self.start(name)?;
        self.end()
    }

    /// `<name>text</name>`
    pub(crate) fn text(&mut self, name: &str, text: &str) -> DavResult<()> {
        self.start(name)?;
        self.w.write(XmlWEvent::characters(text))?;
        self.end()
    }

    /// `<name attr="value">text</name>`
    pub(crate) fn text_attr(
        &mut self,
        name: &str,
        attr: (&str, &str),
        text: &str,
    ) -> DavResult<()> {
        self.w
            .write(XmlWEvent::start_element(name).attr(attr.0, attr.1))?;
        self.w.write(XmlWEvent::characters(text))?;
        self.end()
    }

    pub(crate) fn finish(mut self) -> Bytes {
        self.w.inner_mut().take()
    }
}

// the properties of one resource.
fn write_props(x: &mut XmlBuilder, path: &DavPath, meta: &DavMetaData) -> DavResult<()> {
    x.start("D:prop")?;

    x.start("D:resourcetype")?;
    if meta.is_collection {
        x.empty("D:collection")?;
    }
    x.end()?;

    if !meta.is_collection {
        x.text("D:getcontenttype", &meta.content_type)?;
    }

    let created = meta.created.unwrap_or(meta.modified);
    x.text_attr(
        "D:creationdate",
        ("b:dt", "dateTime.tz"),
        &systemtime_to_rfc3339(created),
    )?;
    x.text("D:getlastmodified", &systemtime_to_httpdate(meta.modified))?;
    let accessed = meta.accessed.unwrap_or(meta.modified);
    x.text("Z:Win32LastAccessTime", &systemtime_to_httpdate(accessed))?;

    x.text("D:displayname", path.file_name())?;
    x.text("D:ishidden", if meta.hidden { "1" } else { "0" })?;

    if let Some(len) = meta.len() {
        x.text("D:getcontentlength", &len.to_string())?;
    }

    x.end()
}

/// PROPFIND response, one `<D:response>` per entry.
pub(crate) fn propfind(entries: &[(DavPath, DavMetaData)]) -> DavResult<Bytes> {
    let mut x = XmlBuilder::new();
    x.root("D:multistatus")?;
    for (path, meta) in entries {
        x.start("D:response")?;
        x.text("D:href", &path.as_url_string(meta.is_collection))?;
        x.start("D:propstat")?;
        write_props(&mut x, path, meta)?;
        x.text("D:status", &status_line(StatusCode::OK))?;
        x.end()?;
        x.end()?;
    }
    x.end()?;
    Ok(x.finish())
}

/// PROPPATCH acknowledgement: every named property reported as 200 OK.
///
/// `props` are (prefix, local name) pairs, prefixes as declared by `root`.
pub(crate) fn proppatch(
    path: &DavPath,
    is_collection: bool,
    props: &[(&str, String)],
) -> DavResult<Bytes> {
    let mut x = XmlBuilder::new();
    x.root("D:multistatus")?;
    x.start("D:response")?;
    x.text("D:href", &path.as_url_string(is_collection))?;
    x.start("D:propstat")?;
    x.start("D:prop")?;
    for (prefix, name) in props {
        x.empty(&format!("{prefix}:{name}"))?;
    }
    x.end()?;
    x.text("D:status", &status_line(StatusCode::OK))?;
    x.end()?;
    x.end()?;
    x.end()?;
    Ok(x.finish())
}

/// LOCK response body.
pub(crate) fn lockdiscovery(
    path: &DavPath,
    token: &str,
    scope: LockScope,
    timeout_secs: u64,
) -> DavResult<Bytes> {
    let mut x = XmlBuilder::new();
    x.root("D:prop")?;
    x.start("D:lockdiscovery")?;
    x.start("D:activelock")?;

    x.start("D:lockscope")?;
    x.empty(match scope {
        LockScope::Exclusive => "D:exclusive",
        LockScope::Shared => "D:shared",
    })?;
    x.end()?;
    x.start("D:locktype")?;
    x.empty("D:write")?;
    x.end()?;
    x.text("D:depth", "infinity")?;
    x.text("D:timeout", &format!("Second-{timeout_secs}"))?;

    x.start("D:locktoken")?;
    x.text("D:href", token)?;
    x.end()?;
    x.start("D:lockroot")?;
    x.text("D:href", &path.as_url_string(false))?;
    x.end()?;

    x.end()?;
    x.end()?;
    x.end()?;
    Ok(x.finish())
}
