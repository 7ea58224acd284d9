use headers::HeaderMapExt;
use http::header::{HeaderValue, ALLOW};
use http::{Request, Response};

use crate::body::Body;
use crate::davheaders::{DAV, MS_AUTHOR_VIA};
use crate::util::DavMethod;
use crate::DavResult;

impl crate::DavHandler {
    /// OPTIONS never looks at the storage backend; the answer only depends
    /// on the configuration.
    pub(crate) async fn handle_options(&self, _req: &Request<()>) -> DavResult<Response<Body>> {
        let mut res = Response::new(Body::empty());

        let h = res.headers_mut();
        let dav = if self.ls.is_some() { "1, 2" } else { "1" };
        h.insert(DAV.clone(), HeaderValue::from_static(dav));
        h.insert(MS_AUTHOR_VIA.clone(), HeaderValue::from_static("DAV"));
        h.typed_insert(headers::ContentLength(0));

        let allow = self.allowed_methods().join(", ");
        h.insert(ALLOW, HeaderValue::from_str(&allow)?);

        Ok(res)
    }

    // methods to report in Allow:, in a fixed order.
    pub(crate) fn allowed_methods(&self) -> Vec<&'static str> {
        let mut methods = vec![
            DavMethod::Options,
            DavMethod::Get,
            DavMethod::Head,
            DavMethod::Put,
            DavMethod::Delete,
            DavMethod::Copy,
            DavMethod::Move,
            DavMethod::PropFind,
            DavMethod::PropPatch,
            DavMethod::MkCol,
        ];
        if self.ls.is_some() {
            methods.push(DavMethod::Lock);
            methods.push(DavMethod::Unlock);
        }
        methods
            .into_iter()
            .filter(|m| self.allow.contains_method(*m))
            .map(|m| m.as_str())
            .collect()
    }
}
