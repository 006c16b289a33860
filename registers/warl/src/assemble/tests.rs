// Licensed under the Apache-2.0 license

use super::*;
use crate::config::LegalizeFilter;
use crate::eval::RegisterFile;
use crate::procedure::Stmt;
use crate::types::{PrivilegeLevel, Xlen};
use log::LevelFilter;
use simple_logger::SimpleLogger;

const DEFINITION: &str = r#"
[[register]]
name = "mstatus"
address = 0x300
privilege = "machine"
reset_value = 0x2_0000_1800

[[register.rv64.fields]]
name = "sie"
msb = 1
lsb = 1

[[register.rv64.fields]]
name = "mie"
msb = 3
lsb = 3

[[register.rv64.fields]]
name = "mpp"
msb = 12
lsb = 11
warl = { legal = ["[1:0] in [0, 1, 3]"], wr_illegal = ["unchanged"] }

[[register.rv64.fields]]
name = "xs"
msb = 16
lsb = 15
implemented = false

[[register.rv64.fields]]
name = "uxl"
msb = 33
lsb = 32
ro_constant = 2

[[register.rv64.fields]]
name = "sd"
msb = 63
lsb = 63
ro_variable = true

[[register]]
name = "sstatus"
address = 0x100
privilege = "supervisor"

[[register.rv64.fields]]
name = "sie"
msb = 1
lsb = 1
shadow = "mstatus.sie"
shadow_type = "rw"

[[register.rv64.fields]]
name = "uxl"
msb = 33
lsb = 32
shadow = "mstatus.uxl"
shadow_type = "ro"

[[register]]
name = "mtvec"
address = 0x305
privilege = "machine"

[[register.rv64.fields]]
name = "base"
msb = 63
lsb = 2

[[register.rv64.fields]]
name = "mode"
msb = 1
lsb = 0
warl = { legal = ["[1:0] in [0, 1]"], wr_illegal = ["unchanged"] }

[[register]]
name = "satp"
address = 0x180
privilege = "supervisor"

[[register.rv64.fields]]
name = "ppn"
msb = 43
lsb = 0

[[register.rv64.fields]]
name = "mode"
msb = 63
lsb = 60
warl = { dependency_fields = ["mstatus::mpp"], legal = ["mpp[1:0] in [3] -> [3:0] in [0, 8]"], wr_illegal = ["mpp[1:0] in [3] -> unchanged"] }

[[register]]
name = "mepc"
address = 0x341
privilege = "machine"
rv64 = { scalar = { msb = 63, lsb = 1 } }

[[register]]
name = "mcycle"
address = 0xb00
privilege = "machine"
rv64 = {}

[[register]]
name = "cycle"
address = 0xc00
privilege = "any"
rv64 = {}

[[register]]
name = "medeleg"
address = 0x302
privilege = "machine"
rv32 = {}
"#;

fn compile_str(text: &str, config: &CompileConfig) -> WarlResult<CompiledRegisters> {
    let _ = SimpleLogger::new().with_level(LevelFilter::Info).init();
    let definition = Definition::from_toml_str(text).unwrap();
    compile(&definition, config)
}

fn fixture() -> CompiledRegisters {
    compile_str(DEFINITION, &CompileConfig::default()).unwrap()
}

#[test]
fn test_tables() {
    let compiled = fixture();
    let tables = &compiled.tables;
    assert_eq!(
        tables.names.keys().copied().collect::<Vec<_>>(),
        vec![0x100, 0x180, 0x300, 0x305, 0x341, 0xb00, 0xc00]
    );
    assert_eq!(
        tables.write.keys().copied().collect::<Vec<_>>(),
        vec![0x100, 0x180, 0x300, 0x305, 0x341]
    );
    assert_eq!(tables.read.len(), tables.write.len());

    assert!(tables.is_defined(0x100, PrivilegeLevel::Supervisor));
    assert!(!tables.is_defined(0x100, PrivilegeLevel::User));
    assert!(!tables.is_defined(0x300, PrivilegeLevel::Supervisor));
    assert!(tables.is_defined(0xc00, PrivilegeLevel::User));
    assert!(!tables.is_defined(0x302, PrivilegeLevel::Machine));

    assert_eq!(tables.name_of(0x305), Some("mtvec"));
    assert_eq!(tables.address_of("satp"), Some(0x180));
}

#[test]
fn test_procedures() {
    let compiled = fixture();
    let names: Vec<&str> = compiled.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "legalize_field_mstatus_mpp",
            "legalize_field_mtvec_mode",
            "legalize_field_satp_mode"
        ]
    );
    assert!(compiled.register("mstatus").unwrap().get.is_none());
    let sstatus = compiled.register("sstatus").unwrap();
    assert_eq!(sstatus.legalize.name, "legalize_sstatus");
    assert_eq!(sstatus.get.as_ref().unwrap().name, "get_sstatus");
    assert!(matches!(
        &sstatus.legalize.body[1],
        Stmt::Store { register, .. } if register == "mstatus"
    ));
    assert_eq!(compiled.register("mepc").unwrap().width, 64);
    assert_eq!(
        compiled.register_at(0x100).map(|r| r.name.as_str()),
        Some("sstatus")
    );
    assert!(compiled.register_at(0xb00).is_none());
}

#[test]
fn test_reset() {
    let compiled = fixture();
    let file = RegisterFile::new(&compiled);
    assert_eq!(file.value("mstatus"), Some(0x2_0000_1800));
    assert_eq!(file.value("mtvec"), Some(0));
    assert_eq!(file.value("mcycle"), None);
    assert_eq!(compiled.reset.body.len(), compiled.registers.len());
}

#[test]
fn test_reset_holds_read_only_constants() {
    let compiled = compile_str(
        r#"
[[register]]
name = "misa"
address = 0x301
privilege = "machine"
reset_value = 0x101

[[register.rv64.fields]]
name = "extensions"
msb = 25
lsb = 0

[[register.rv64.fields]]
name = "mxl"
msb = 63
lsb = 62
ro_constant = 2
"#,
        &CompileConfig::default(),
    )
    .unwrap();
    assert_eq!(
        compiled.reset.body,
        vec![Stmt::Store {
            register: "misa".to_string(),
            value: Expr::Const(0x8000_0000_0000_0101),
        }]
    );

    // No write has happened yet: mxl already reads as its constant.
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.read(0x301).map(|v| v >> 62), Some(2));
    assert_eq!(file.read(0x301), Some(0x8000_0000_0000_0101));
    file.write(0x301, 0);
    file.reset();
    assert_eq!(file.value("misa"), Some(0x8000_0000_0000_0101));
}

#[test]
fn test_warl_field_unchanged() {
    let compiled = fixture();
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0x305, 0x1003), Some(0x1000));
    assert_eq!(file.write(0x305, 0x2001), Some(0x2001));
    assert_eq!(file.write(0x305, 0x3), Some(0x1));
    assert_eq!(file.read(0x305), Some(0x1));
}

#[test]
fn test_read_only_and_uncovered_bits() {
    let compiled = fixture();
    let mut file = RegisterFile::new(&compiled);
    // sie, mie and mpp take the written bits, uxl is constant, sd keeps its
    // value and every undeclared bit (xs included) is preserved.
    assert_eq!(file.write(0x300, u64::MAX), Some(0x2_0000_180a));
    // mpp = 2 is illegal and keeps 3.
    assert_eq!(file.write(0x300, 0x1000), Some(0x2_0000_1800));

    file.set_value("mstatus", 1 << 63 | 1 << 20);
    assert_eq!(file.write(0x300, 0), Some(1 << 63 | 1 << 20 | 0x2_0000_0000));
}

#[test]
fn test_shadow_propagation() {
    let compiled = fixture();
    let mut file = RegisterFile::new(&compiled);

    assert_eq!(file.write(0x100, 0x2), Some(0x2));
    assert_eq!(file.value("mstatus"), Some(0x2_0000_1802));
    assert_eq!(file.read(0x300), Some(0x2_0000_1802));
    // The read-only shadow of uxl is synthesized from mstatus.
    assert_eq!(file.read(0x100), Some(0x2_0000_0002));

    // Clearing the target is visible through the shadow.
    assert_eq!(file.write(0x300, 0x1800), Some(0x2_0000_1800));
    assert_eq!(file.read(0x100), Some(0x2_0000_0000));

    // Writes to a read-only shadow leave the target alone.
    file.write(0x100, 0x3_0000_0000);
    assert_eq!(file.value("mstatus"), Some(0x2_0000_1800));
}

#[test]
fn test_dependency_gating() {
    let compiled = fixture();
    let mut file = RegisterFile::new(&compiled);
    // mpp = 3 at reset: the clause applies.
    assert_eq!(file.write(0x180, 9 << 60 | 0x123), Some(0x123));
    assert_eq!(file.write(0x180, 8 << 60 | 0x123), Some(8 << 60 | 0x123));

    // mpp = 0: the only clause is gated off and any mode is accepted.
    assert_eq!(file.write(0x300, 0), Some(0x2_0000_0000));
    assert_eq!(file.write(0x180, 5 << 60), Some(5 << 60));
}

#[test]
fn test_scalar_padding() {
    let compiled = fixture();
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0x341, 0xffff), Some(0xfffe));
    assert_eq!(file.read(0x341), Some(0xfffe));
}

#[test]
fn test_skipped_registers() {
    let compiled = fixture();
    assert!(compiled.register("mcycle").is_none());
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0xb00, 1), None);
    assert_eq!(file.read(0xc00), None);
    assert!(file.is_defined(0xb00, PrivilegeLevel::Machine));
    assert_eq!(file.name_of(0xc00), Some("cycle"));

    let compiled = compile_str(
        DEFINITION,
        &CompileConfig::default().with_filter(LegalizeFilter::none()),
    )
    .unwrap();
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0xb00, u64::MAX), Some(u64::MAX));
    assert_eq!(file.read(0xc00), Some(0));
}

#[test]
fn test_rv32_profile() {
    let compiled = compile_str(DEFINITION, &CompileConfig::new(Xlen::Rv32)).unwrap();
    assert_eq!(compiled.xlen, Xlen::Rv32);
    assert_eq!(compiled.tables.names.len(), 1);
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0x302, u64::MAX), Some(0xffff_ffff));
    assert_eq!(file.address_of("mstatus"), None);
}

const SHADOW_TARGETS: &str = r#"
[[register]]
name = "mtvec"
address = 0x305
privilege = "machine"

[[register.rv64.fields]]
name = "base"
msb = 63
lsb = 2

[[register.rv64.fields]]
name = "mode"
msb = 1
lsb = 0
warl = { legal = ["[1:0] in [0, 1]"], wr_illegal = ["unchanged"] }

[[register]]
name = "mode_alias"
address = 0x7c0
privilege = "machine"

[[register.rv64.fields]]
name = "mode"
msb = 1
lsb = 0
shadow = "mtvec.mode"
shadow_type = "rw"

[[register]]
name = "mtvec_alias"
address = 0x7c1
privilege = "machine"
rv64 = { scalar = { msb = 63, lsb = 0, shadow = "mtvec", shadow_type = "rw" } }
"#;

#[test]
fn test_shadow_of_warl_field() {
    let compiled = compile_str(SHADOW_TARGETS, &CompileConfig::default()).unwrap();
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0x7c0, 1), Some(1));
    assert_eq!(file.value("mtvec"), Some(1));
    // 3 is illegal for mtvec.mode, so both copies keep 1.
    assert_eq!(file.write(0x7c0, 3), Some(1));
    assert_eq!(file.value("mtvec"), Some(1));
}

#[test]
fn test_shadow_of_whole_register() {
    let compiled = compile_str(SHADOW_TARGETS, &CompileConfig::default()).unwrap();
    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0x7c1, 0x1003), Some(0x1000));
    assert_eq!(file.value("mtvec"), Some(0x1000));
    assert_eq!(file.write(0x305, 0x2001), Some(0x2001));
    assert_eq!(file.read(0x7c1), Some(0x2001));
}

fn compile_err(text: &str) -> WarlError {
    compile_str(text, &CompileConfig::default()).unwrap_err()
}

#[test]
fn test_overlapping_fields() {
    let err = compile_err(
        r#"
[[register]]
name = "mie"
address = 0x304
privilege = "machine"
rv64 = { fields = [{ name = "ssie", msb = 1, lsb = 1 }, { name = "wide", msb = 3, lsb = 0 }] }
"#,
    );
    assert_eq!(
        err,
        WarlError::OverlappingField {
            register: "mie".to_string(),
            first: "ssie".to_string(),
            second: "wide".to_string(),
        }
    );
}

#[test]
fn test_forward_shadow_reference() {
    let err = compile_err(
        r#"
[[register]]
name = "sstatus"
address = 0x100
privilege = "supervisor"
rv64 = { fields = [{ name = "sie", msb = 1, lsb = 1, shadow = "mstatus.sie", shadow_type = "rw" }] }

[[register]]
name = "mstatus"
address = 0x300
privilege = "machine"
rv64 = { fields = [{ name = "sie", msb = 1, lsb = 1 }] }
"#,
    );
    assert_eq!(
        err,
        WarlError::ForwardShadowReference {
            register: "sstatus".to_string(),
            field: "sie".to_string(),
            target: "mstatus.sie".to_string(),
        }
    );

    // A register cannot shadow itself.
    let err = compile_err(
        r#"
[[register]]
name = "mstatus"
address = 0x300
privilege = "machine"
rv64 = { fields = [{ name = "a", msb = 0, lsb = 0 }, { name = "b", msb = 1, lsb = 1, shadow = "mstatus.a", shadow_type = "ro" }] }
"#,
    );
    assert!(matches!(err, WarlError::ForwardShadowReference { .. }));
}

#[test]
fn test_missing_shadow_field() {
    let err = compile_err(
        r#"
[[register]]
name = "mstatus"
address = 0x300
privilege = "machine"
rv64 = { fields = [{ name = "sie", msb = 1, lsb = 1 }] }

[[register]]
name = "sstatus"
address = 0x100
privilege = "supervisor"
rv64 = { fields = [{ name = "spp", msb = 8, lsb = 8, shadow = "mstatus.spp", shadow_type = "rw" }] }
"#,
    );
    assert!(matches!(err, WarlError::InvalidDefinition { register, .. } if register == "sstatus"));
}

#[test]
fn test_duplicate_address() {
    let err = compile_err(
        r#"
[[register]]
name = "mscratch"
address = 0x340
privilege = "machine"
rv64 = {}

[[register]]
name = "mscratch2"
address = 0x340
privilege = "machine"
rv64 = {}
"#,
    );
    assert_eq!(
        err,
        WarlError::DuplicateAddress {
            address: 0x340,
            first: "mscratch".to_string(),
            second: "mscratch2".to_string(),
        }
    );

    // Different profiles may reuse an address.
    let text = r#"
[[register]]
name = "a"
address = 0x340
privilege = "machine"
rv32 = {}

[[register]]
name = "b"
address = 0x340
privilege = "machine"
rv64 = {}
"#;
    assert!(compile_str(text, &CompileConfig::default()).is_ok());
    assert!(compile_str(text, &CompileConfig::new(Xlen::Rv32)).is_ok());
}

#[test]
fn test_register_names_ignore_case() {
    let err = compile_err(
        r#"
[[register]]
name = "mscratch"
address = 0x340
privilege = "machine"
rv64 = {}

[[register]]
name = "MSCRATCH"
address = 0x341
privilege = "machine"
rv64 = {}
"#,
    );
    assert!(matches!(err, WarlError::InvalidDefinition { register, .. } if register == "MSCRATCH"));

    let compiled = fixture();
    assert_eq!(compiled.tables.address_of("MTVEC"), Some(0x305));
}

const PROCEDURE_NAMES: &str = r#"
[[register]]
name = "mtvec"
address = 0x305
privilege = "machine"

[[register.rv64.fields]]
name = "mode"
msb = 1
lsb = 0
warl = { legal = ["[1:0] in [0, 1]"], wr_illegal = ["unchanged"] }

[[register]]
name = "mtvec_mode"
address = 0x7c0
privilege = "machine"
rv64 = { scalar = { msb = 1, lsb = 0, warl = { legal = ["[1:0] in [2, 3]"], wr_illegal = ["largest"] } } }
"#;

#[test]
fn test_field_and_register_procedures_do_not_collide() {
    let compiled = compile_str(PROCEDURE_NAMES, &CompileConfig::default()).unwrap();
    let mut names: Vec<&str> = compiled.fields.iter().map(|f| f.name.as_str()).collect();
    names.extend(compiled.registers.iter().map(|r| r.legalize.name.as_str()));
    assert_eq!(
        names,
        vec![
            "legalize_field_mtvec_mode",
            "legalize_field_mtvec_mode_value",
            "legalize_mtvec",
            "legalize_mtvec_mode"
        ]
    );
    let text = compiled.to_string();
    assert_eq!(text.matches("function legalize_mtvec_mode(").count(), 1);
    assert_eq!(text.matches("function legalize_field_mtvec_mode(").count(), 1);

    let mut file = RegisterFile::new(&compiled);
    assert_eq!(file.write(0x305, 3), Some(0));
    assert_eq!(file.write(0x7c0, 1), Some(3));

    // A register whose own procedure would shadow a field legalizer is
    // rejected rather than rendered twice.
    let err = compile_err(&format!(
        "{PROCEDURE_NAMES}\n{}",
        r#"
[[register]]
name = "field_mtvec_mode"
address = 0x7c1
privilege = "machine"
rv64 = { scalar = { msb = 63, lsb = 0 } }
"#
    ));
    assert!(matches!(
        err,
        WarlError::InvalidDefinition { register, message }
            if register == "field_mtvec_mode" && message.contains("legalize_field_mtvec_mode")
    ));
}

#[test]
fn test_unresolved_dependency() {
    let err = compile_err(
        r#"
[[register]]
name = "satp"
address = 0x180
privilege = "supervisor"

[[register.rv64.fields]]
name = "mode"
msb = 63
lsb = 60
warl = { dependency_fields = ["mstatus::mpp"], legal = ["mpp[1:0] in [3] -> [3:0] in [0, 8]"] }
"#,
    );
    assert_eq!(
        err,
        WarlError::UnresolvedDependency {
            register: "satp".to_string(),
            field: "mode".to_string(),
            dependency: "mstatus::mpp".to_string(),
        }
    );
}

#[test]
fn test_errors_abort_without_output() {
    // The second register is fine but the first error wins.
    let text = format!(
        "{}\n{}",
        r#"
[[register]]
name = "bad"
address = 0x7c0
privilege = "machine"
rv64 = { fields = [{ name = "a", msb = 1, lsb = 0, warl = { legal = ["[1:0] in [0"] } }] }
"#,
        DEFINITION
    );
    assert!(matches!(compile_err(&text), WarlError::Syntax { .. }));
}
