//! Identity of one raw input.

use std::fmt;
use std::rc::Rc;

/// Identifies one raw input to the pipeline.
///
/// Two sources compare equal when they name the same input. The two
/// sentinel variants stand for "no real source": [`InputSource::Unknown`]
/// for positions that could not be traced anywhere, and
/// [`InputSource::Predefined`] for constructs synthesized by the compiler
/// itself rather than read from user input.
///
/// The URI payload is reference counted so that cloning a source (which
/// happens for every token) is cheap. The pipeline is single threaded, so
/// `Rc` suffices.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// No real source. Positions in this source carry no information.
    Unknown,
    /// A synthetic source for predefined, compiler-generated constructs.
    Predefined,
    /// A real input, identified by URI.
    Uri(Rc<str>),
}

impl InputSource {
    /// Create a source from a URI string.
    pub fn new(uri: impl Into<Rc<str>>) -> Self {
        InputSource::Uri(uri.into())
    }

    /// The URI of this source. Sentinels render as pseudo-URIs.
    pub fn uri(&self) -> &str {
        match self {
            InputSource::Unknown => "unknown:///unknown",
            InputSource::Predefined => "predefined:///predefined",
            InputSource::Uri(uri) => uri,
        }
    }

    /// The path component after the last `/`, used by short renderings.
    pub fn short_name(&self) -> &str {
        let uri = self.uri();
        uri.rsplit('/').next().unwrap_or(uri)
    }

    /// True iff this is a real source, not a sentinel.
    pub fn is_real(&self) -> bool {
        matches!(self, InputSource::Uri(_))
    }

    /// True for the [`InputSource::Unknown`] sentinel.
    pub fn is_unknown(&self) -> bool {
        matches!(self, InputSource::Unknown)
    }

    /// True iff `self` and `other` name the same real source.
    ///
    /// Unlike `==`, two unknown sources do not count as the same source;
    /// spans may only be combined across positions for which this holds.
    pub fn same_real_source(&self, other: &InputSource) -> bool {
        self.is_real() && self == other
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}
