use xmltree::Element;

/// A parsed SOAP envelope. We keep the body as a raw [`xmltree::Element`]
/// rather than fully typing every action's response shape, since each
/// adapter only cares about a handful of named child elements per call.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    pub body: Element,
}
