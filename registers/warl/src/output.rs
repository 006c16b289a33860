// Licensed under the Apache-2.0 license

//! Text rendering of compiled procedures.
//!
//! [`CompiledRegisters`] renders as Sail-flavoured source. Rendering reads
//! the finished procedure trees only; nothing here feeds back into assembly.
//!
//! ## Output Structure
//!
//! ```text
//! function legalize_field_mtvec_mode(current : bits(2), written : bits(2)) -> bits(2) = {
//!   legal 0x3 in [0x0, 0x1];
//!   illegal => Unchanged;
//! }
//!
//! function legalize_mtvec(current : bits(64), written : bits(64)) -> bits(64) = {
//!   var v = current;
//!   v = [v with 63 .. 2 = written[63 .. 2]];
//!   v = [v with 1 .. 0 = legalize_field_mtvec_mode(current[1 .. 0], written[1 .. 0])];
//!   v
//! }
//!
//! function reset_regs() -> unit = { ... }
//! function read_csr(csr : csreg) -> option(xlenbits) = match csr { ... }
//! function write_csr(csr : csreg, value : xlenbits) -> option(xlenbits) = match csr { ... }
//! function is_csr_defined(csr : csreg, p : Privilege) -> bool = match csr { ... }
//! mapping clause csr_name_map = 0x305 <-> "mtvec"
//! ```

use crate::field::FieldProcedure;
use crate::procedure::{CompiledRegisters, Expr, Procedure, RegisterProcedures, Stmt};
use crate::range::{LegalSet, RangeEntry};
use crate::types::{FallbackRule, LegalClause, Predicate, Privilege, Resolution};
use crate::util::{hex_literal, identifier};
use std::fmt;

impl fmt::Display for RangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RangeEntry::Value(v) => write!(f, "{}", hex_literal(v)),
            RangeEntry::Interval(lo, hi) => write!(f, "{}:{}", hex_literal(lo), hex_literal(hi)),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, entries: &[RangeEntry]) -> fmt::Result {
    write!(f, "[")?;
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{entry}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{}[{} .. {}] in ", term.register, term.msb, term.lsb)?;
            write_list(f, &term.values)?;
        }
        Ok(())
    }
}

impl fmt::Display for LegalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegalSet::Segments(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{} in ", hex_literal(segment.mask))?;
                    write_list(f, segment.values())?;
                }
                Ok(())
            }
            LegalSet::Bitmask(bitmask) => write!(
                f,
                "bitmask [{}, {}]",
                hex_literal(bitmask.mask),
                hex_literal(bitmask.default)
            ),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Literal(value) => write!(f, "{}", hex_literal(*value)),
            Resolution::Resolve(mode) => write!(f, "{mode}"),
        }
    }
}

impl fmt::Display for LegalClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(guard) = &self.guard {
            write!(f, "when {guard} ")?;
        }
        write!(f, "legal {}", self.set)
    }
}

impl fmt::Display for FallbackRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.guard.as_ref().filter(|g| !g.terms.is_empty());
        match (guard, &self.trigger) {
            (Some(guard), Some(trigger)) => {
                write!(f, "when {guard} & written in ")?;
                write_list(f, trigger)?;
                write!(f, " ")?;
            }
            (Some(guard), None) => write!(f, "when {guard} ")?,
            (None, Some(trigger)) => {
                write!(f, "when written in ")?;
                write_list(f, trigger)?;
                write!(f, " ")?;
            }
            (None, None) => {}
        }
        write!(f, "illegal => {}", self.action)
    }
}

impl fmt::Display for FieldProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width;
        writeln!(
            f,
            "function {}(current : bits({width}), written : bits({width})) -> bits({width}) = {{",
            self.name
        )?;
        for clause in &self.rule.legal {
            writeln!(f, "  {clause};")?;
        }
        for rule in &self.rule.illegal {
            writeln!(f, "  {rule};")?;
        }
        writeln!(f, "}}")
    }
}

fn is_atom(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Current | Expr::Written | Expr::Acc | Expr::Const(_) | Expr::Register(_)
    )
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Current => write!(f, "current"),
            Expr::Written => write!(f, "written"),
            Expr::Acc => write!(f, "v"),
            Expr::Const(value) => write!(f, "{}", hex_literal(*value)),
            Expr::Register(name) => write!(f, "{}", identifier(name)),
            Expr::Slice { value, msb, lsb } if is_atom(value) => {
                write!(f, "{value}[{msb} .. {lsb}]")
            }
            Expr::Slice { value, msb, lsb } => write!(f, "({value})[{msb} .. {lsb}]"),
            Expr::Insert {
                base,
                msb,
                lsb,
                value,
            } => write!(f, "[{base} with {msb} .. {lsb} = {value}]"),
            Expr::LegalizeField {
                procedure,
                current,
                written,
            } => write!(f, "{procedure}({current}, {written})"),
            Expr::LegalizeRegister {
                register,
                current,
                written,
            } => write!(f, "legalize_{}({current}, {written})", identifier(register)),
        }
    }
}

fn write_body(f: &mut fmt::Formatter<'_>, procedure: &Procedure) -> fmt::Result {
    let mut first = true;
    for stmt in &procedure.body {
        match stmt {
            Stmt::Assign(expr) if first => writeln!(f, "  var v = {expr};")?,
            Stmt::Assign(expr) => writeln!(f, "  v = {expr};")?,
            Stmt::Store { register, value } => {
                writeln!(f, "  {} = {value};", identifier(register))?
            }
        }
        first &= !matches!(stmt, Stmt::Assign(_));
    }
    if first {
        writeln!(f, "  var v = current;")?;
    }
    writeln!(f, "  v")
}

impl fmt::Display for RegisterProcedures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width;
        writeln!(
            f,
            "function {}(current : bits({width}), written : bits({width})) -> bits({width}) = {{",
            self.legalize.name
        )?;
        write_body(f, &self.legalize)?;
        writeln!(f, "}}")?;
        if let Some(get) = &self.get {
            writeln!(f)?;
            writeln!(
                f,
                "function {}(current : bits({width})) -> bits({width}) = {{",
                get.name
            )?;
            write_body(f, get)?;
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

fn privilege_condition(privilege: Privilege) -> &'static str {
    match privilege {
        Privilege::Machine => "p == Machine",
        Privilege::Supervisor => "p == Machine | p == Supervisor",
        Privilege::Any => "true",
    }
}

impl CompiledRegisters {
    fn write_tables(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function read_csr(csr : csreg) -> option(xlenbits) = match csr {{")?;
        for (address, name) in &self.tables.read {
            let register = identifier(name);
            match self.register_at(*address).and_then(|r| r.get.as_ref()) {
                Some(get) => writeln!(f, "  {address:#05x} => Some({}({register})),", get.name)?,
                None => writeln!(f, "  {address:#05x} => Some({register}),")?,
            }
        }
        writeln!(f, "  _ => None()")?;
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(
            f,
            "function write_csr(csr : csreg, value : xlenbits) -> option(xlenbits) = match csr {{"
        )?;
        for (address, name) in &self.tables.write {
            let register = identifier(name);
            writeln!(
                f,
                "  {address:#05x} => {{ {register} = legalize_{register}({register}, value); Some({register}) }},"
            )?;
        }
        writeln!(f, "  _ => None()")?;
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(
            f,
            "function is_csr_defined(csr : csreg, p : Privilege) -> bool = match csr {{"
        )?;
        for (address, privilege) in &self.tables.defined {
            writeln!(f, "  {address:#05x} => {},", privilege_condition(*privilege))?;
        }
        writeln!(f, "  _ => false")?;
        writeln!(f, "}}")?;
        writeln!(f)?;

        for (address, name) in &self.tables.names {
            writeln!(f, "mapping clause csr_name_map = {address:#05x} <-> \"{name}\"")?;
        }
        Ok(())
    }
}

impl fmt::Display for CompiledRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "/* WARL legalization procedures for {} */", self.xlen)?;
        writeln!(f)?;
        for field in &self.fields {
            writeln!(f, "{field}")?;
        }
        for register in &self.registers {
            writeln!(f, "{register}")?;
        }

        writeln!(f, "function {}() -> unit = {{", self.reset.name)?;
        for stmt in &self.reset.body {
            if let Stmt::Store { register, value } = stmt {
                writeln!(f, "  {} = {value};", identifier(register))?;
            }
        }
        writeln!(f, "}}")?;
        writeln!(f)?;

        self.write_tables(f)
    }
}
