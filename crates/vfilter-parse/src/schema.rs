/// Which section of the record a tag is declared in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Info,
    Format,
    Filter,
}

/// The four primitive value domains a tag can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    String,
    Flag,
}

/// Declared vector shape for a tag.
///
/// `One` binds directly to a scalar setter; the rest require an explicit
/// `[i]` subscript (or, inside a reduction function, flatten whole).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    One,
    /// Per-alternate-allele.
    Alt,
    /// Per-reference-and-alternate-allele.
    RefAlt,
    /// Per-genotype.
    Genotype,
    /// Unspecified/variable length.
    Dot,
}

impl Arity {
    pub fn is_unary(self) -> bool {
        matches!(self, Arity::One)
    }
}

/// The record-type header, described only by the interface it exposes.
///
/// A real implementation resolves these against a parsed VCF-like header;
/// `vfilter-parse` only ever consumes the trait. `id_of` takes the
/// namespace explicitly (names are not unique across INFO/FORMAT/FILTER
/// sections in practice, even though the distilled grammar only carries
/// the name string).
pub trait Schema: Send + Sync {
    fn id_of(&self, namespace: Namespace, name: &str) -> Option<u32>;
    fn is_defined(&self, namespace: Namespace, id: u32) -> bool;
    fn declared_type(&self, namespace: Namespace, id: u32) -> ValueType;
    fn declared_arity(&self, namespace: Namespace, id: u32) -> Arity;
    fn nsamples(&self) -> usize;
}

/// `FxHashMap`-backed [`Schema`] used by this workspace's own tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use rustc_hash::FxHashMap;

    #[derive(Clone, Copy, Debug)]
    pub struct FieldDecl {
        pub value_type: ValueType,
        pub arity: Arity,
    }

    #[derive(Default)]
    pub struct StaticSchema {
        info: FxHashMap<String, (u32, FieldDecl)>,
        format: FxHashMap<String, (u32, FieldDecl)>,
        filter: FxHashMap<String, u32>,
        nsamples: usize,
    }

    impl StaticSchema {
        pub fn new(nsamples: usize) -> Self {
            Self {
                nsamples,
                ..Default::default()
            }
        }

        pub fn with_info(mut self, name: &str, value_type: ValueType, arity: Arity) -> Self {
            let id = self.info.len() as u32;
            self.info
                .insert(name.to_string(), (id, FieldDecl { value_type, arity }));
            self
        }

        pub fn with_format(mut self, name: &str, value_type: ValueType, arity: Arity) -> Self {
            let id = self.format.len() as u32;
            self.format
                .insert(name.to_string(), (id, FieldDecl { value_type, arity }));
            self
        }

        pub fn with_filter(mut self, name: &str) -> Self {
            let id = self.filter.len() as u32;
            self.filter.insert(name.to_string(), id);
            self
        }

        fn table(&self, namespace: Namespace) -> &FxHashMap<String, (u32, FieldDecl)> {
            match namespace {
                Namespace::Info => &self.info,
                Namespace::Format => &self.format,
                Namespace::Filter => unreachable!("FILTER has no typed declaration"),
            }
        }
    }

    impl Schema for StaticSchema {
        fn id_of(&self, namespace: Namespace, name: &str) -> Option<u32> {
            match namespace {
                Namespace::Filter => self.filter.get(name).copied(),
                ns => self.table(ns).get(name).map(|(id, _)| *id),
            }
        }

        fn is_defined(&self, namespace: Namespace, id: u32) -> bool {
            match namespace {
                Namespace::Filter => self.filter.values().any(|v| *v == id),
                ns => self.table(ns).values().any(|(fid, _)| *fid == id),
            }
        }

        fn declared_type(&self, namespace: Namespace, id: u32) -> ValueType {
            self.table(namespace)
                .values()
                .find(|(fid, _)| *fid == id)
                .map(|(_, decl)| decl.value_type)
                .expect("declared_type called with unresolved id")
        }

        fn declared_arity(&self, namespace: Namespace, id: u32) -> Arity {
            self.table(namespace)
                .values()
                .find(|(fid, _)| *fid == id)
                .map(|(_, decl)| decl.arity)
                .expect("declared_arity called with unresolved id")
        }

        fn nsamples(&self) -> usize {
            self.nsamples
        }
    }
}
