//! The public compiled-program API: [`Program`], [`Verdict`], and help text.

use std::io::{self, Write};

use vfilter_parse::{CompileOptions, Schema, Unpack};
use vfilter_util::{BitSet, Result};

use crate::eval::{evaluate_nodes, finalize};
use crate::record::Record;

/// The outcome of evaluating a compiled program against one record.
///
/// `sample_pass` is `None` when the program was compiled against a header
/// carrying no samples — there is nothing to broadcast a per-sample
/// verdict across.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub site_pass: bool,
    pub sample_pass: Option<BitSet>,
}

/// A compiled filter expression, ready to run against any record drawn
/// from the header it was compiled against.
///
/// Compilation resolves every tag reference up front; evaluation only
/// walks the resulting RPN array, so the cost of parsing and header
/// lookup is paid once no matter how many records the program sees.
/// Every field here is owned data (`Box<[Node]>`, `Unpack`, `usize`), so
/// there's nothing to tear down explicitly — ordinary `Drop` suffices.
pub struct Program {
    nodes: Box<[vfilter_parse::Node]>,
    nsamples: usize,
    unpack: Unpack,
}

impl Program {
    /// Parses and binds `text` against `schema`, producing a program ready
    /// to evaluate. Tag references, `%TYPE`/`%FILTER` literals, and arity
    /// all resolve here; `evaluate` never touches the schema again.
    pub fn compile(text: &str, schema: &dyn Schema, options: &CompileOptions) -> Result<Self> {
        let rpn = vfilter_parse::parse(text, schema, options)?;
        Ok(Program {
            nodes: rpn.nodes.into_boxed_slice(),
            nsamples: rpn.nsamples,
            unpack: rpn.unpack,
        })
    }

    /// Which parts of a record this program actually reads. A caller can
    /// use this to skip decoding columns the expression never touches.
    pub fn unpack_mask(&self) -> Unpack {
        self.unpack
    }

    /// Runs the program once against `record`.
    ///
    /// Calls `record.unpack` with this program's mask before reading
    /// anything, then reduces the final stack slot to a site verdict and
    /// a per-sample bitmap — broadcasting the site verdict across every
    /// sample when the expression never produced a genuine per-sample
    /// shape (e.g. it reduced entirely to a site-level comparison).
    pub fn evaluate(&self, record: &mut dyn Record) -> Result<Verdict> {
        record.unpack(self.unpack);
        tracing::trace!(nsamples = self.nsamples, "evaluating compiled filter");
        let top = evaluate_nodes(&self.nodes, record, self.nsamples)?;
        let (site_pass, sample_bits) = finalize(&top, self.nsamples);
        let sample_pass = if self.nsamples > 0 { Some(sample_bits) } else { None };
        Ok(Verdict { site_pass, sample_pass })
    }

    /// Writes a short grammar summary to `writer` — the one place the
    /// supported syntax is spelled out in full, for a caller building its
    /// own `--help` text around this crate.
    pub fn help(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "filter expression grammar:")?;
        writeln!(writer, "  literals       123, 3.5, 1e-2, \"PASS\"")?;
        writeln!(writer, "  tags           bare TAG (INFO, or FORMAT inside a reduction), or explicitly")?;
        writeln!(writer, "                 INFO/TAG, FORMAT/TAG, FMT/TAG")?;
        writeln!(writer, "  subscript      TAG[i]            select one element of a multi-valued tag")?;
        writeln!(writer, "  flag presence  TAG=1 | TAG=0     a Flag-type INFO tag compared bare against 1/0")?;
        writeln!(writer, "  specials       %QUAL  %TYPE  %FILTER")?;
        writeln!(writer, "  arithmetic     +  -  *  /        scalar or per-sample, broadcast either side")?;
        writeln!(writer, "  comparison     <  <=  >  >=  =  == (alias)  !=")?;
        writeln!(writer, "  %TYPE test     %TYPE==\"snp\"|\"mnp\"|\"indel\"|\"other\"|\"ref\"")?;
        writeln!(writer, "  %FILTER test   %FILTER==\"NAME\"   %FILTER==\".\"   (no filter applied)")?;
        writeln!(writer, "  reduction      %MAX(TAG)  %MIN(TAG)  %AVG(TAG)   collapse a per-sample tag to one value")?;
        writeln!(writer, "  site logic     &   |                reduce both sides to one site verdict")?;
        writeln!(writer, "  sample logic   &&  ||               combine per-sample, pointwise")?;
        writeln!(writer, "  grouping       ( expr )")?;
        Ok(())
    }
}
