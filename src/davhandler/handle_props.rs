use headers::HeaderMapExt;
use http::{header, Request, Response, StatusCode};
use xmltree::{Element, XMLNode};

use crate::body::Body;
use crate::davheaders::Depth;
use crate::errors::DavError;
use crate::multistatus::{self, NS_DAV_URI, NS_MS_URI};
use crate::DavResult;

// 207 with an XML body.
pub(crate) fn multistatus_response(xml: bytes::Bytes) -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = StatusCode::MULTI_STATUS;
    let h = res.headers_mut();
    h.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/xml; charset=utf-8"),
    );
    h.typed_insert(headers::ContentLength(xml.len() as u64));
    *res.body_mut() = Body::from(xml);
    res
}

impl crate::DavHandler {
    pub(crate) async fn handle_propfind(
        &self,
        req: &Request<()>,
        xmldata: &[u8],
    ) -> DavResult<Response<Body>> {
        // only 0 and 1 are honoured; infinity is served as 1.
        let depth = match req.headers().typed_get::<Depth>() {
            Some(Depth::Zero) => Depth::Zero,
            _ => Depth::One,
        };

        // the property selection is not honoured, but it must be XML.
        if !xmldata.is_empty() && Element::parse(xmldata).is_err() {
            return Err(DavError::XmlReadError);
        }

        let path = self.path(req)?;
        let meta = self.existing(&path, true).await?;
        let is_collection = meta.is_collection;

        let mut entries = vec![(path.clone(), meta)];
        if depth == Depth::One && is_collection {
            for name in self.fs.list(&path).await? {
                let child = path.join(&name);
                match self.fs.metadata(&child, true).await {
                    Ok(Some(m)) => entries.push((child, m)),
                    Ok(None) => debug!("propfind: {child} vanished"),
                    Err(e) => debug!("propfind: metadata of {child} failed: {e}"),
                }
            }
        }
        debug!("propfind {path} depth {depth:?}: {} entries", entries.len());

        Ok(multistatus_response(multistatus::propfind(&entries)?))
    }

    pub(crate) async fn handle_proppatch(
        &self,
        req: &Request<()>,
        xmldata: &[u8],
    ) -> DavResult<Response<Body>> {
        let path = self.path(req)?;
        let meta = self.existing(&path, false).await?;

        let props = match ms_probe_props(xmldata) {
            Some(props) => props,
            None => {
                return Err(DavError::new(
                    StatusCode::NOT_IMPLEMENTED,
                    "property updates are not supported",
                ))
            }
        };
        self.check_lock(req, &path, None)?;

        let props: Vec<(&str, String)> = props.into_iter().map(|n| ("Z", n)).collect();
        Ok(multistatus_response(multistatus::proppatch(
            &path,
            meta.is_collection,
            &props,
        )?))
    }
}

// Windows clients follow every upload with a PROPPATCH that sets its own
// timestamps (Win32CreationTime and friends). If that is all the request
// does, return the names of those properties.
fn ms_probe_props(xmldata: &[u8]) -> Option<Vec<String>> {
    let root = Element::parse(xmldata).ok()?;
    if root.name != "propertyupdate" || root.namespace.as_deref() != Some(NS_DAV_URI) {
        return None;
    }
    let mut names = Vec::new();
    for op in elements(&root) {
        if op.namespace.as_deref() != Some(NS_DAV_URI) || !(op.name == "set" || op.name == "remove")
        {
            return None;
        }
        for prop in elements(op) {
            if prop.name != "prop" {
                return None;
            }
            for p in elements(prop) {
                if p.namespace.as_deref() != Some(NS_MS_URI) {
                    return None;
                }
                names.push(p.name.clone());
            }
        }
    }
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

fn elements(e: &Element) -> impl Iterator<Item = &Element> {
    e.children.iter().filter_map(XMLNode::as_element)
}
