//! Descriptor model -> `module-info.class` bytes.
//!
//! Attribute bodies are assembled first so that every name lands in the
//! constant pool before the pool itself is written after the header.

use crate::core::classfile::{
    ByteWriter, ACC_MANDATED, ACC_MODULE, ACC_OPEN, ACC_STATIC_PHASE, ACC_SYNTHETIC,
    ACC_TRANSITIVE, ATTR_MODULE, ATTR_MODULE_MAIN_CLASS, ATTR_MODULE_PACKAGES, MAGIC,
    MAJOR_VERSION, MINOR_VERSION, THIS_CLASS,
};
use crate::core::constant_pool::ConstantPool;
use crate::domain::model::{Descriptor, Modifier, PackageDirective};
use crate::utils::error::{ModuleError, Result};
use std::collections::BTreeSet;

pub fn encode(descriptor: &Descriptor) -> Result<Vec<u8>> {
    let mut pool = ConstantPool::new();
    let this_class = pool.class(THIS_CLASS)?;

    let mut attributes: Vec<(u16, Vec<u8>)> = Vec::with_capacity(3);

    let module_name = pool.utf8(ATTR_MODULE)?;
    attributes.push((module_name, module_attribute(&mut pool, descriptor)?));

    if !descriptor.packages.is_empty() {
        let name = pool.utf8(ATTR_MODULE_PACKAGES)?;
        let mut body = ByteWriter::new();
        body.write_count("packages", descriptor.packages.len())?;
        for package in &descriptor.packages {
            body.write_u16_be(pool.package(package)?);
        }
        attributes.push((name, body.into_bytes()));
    }

    if let Some(main_class) = &descriptor.main_class {
        let name = pool.utf8(ATTR_MODULE_MAIN_CLASS)?;
        let mut body = ByteWriter::new();
        body.write_u16_be(pool.class(main_class)?);
        attributes.push((name, body.into_bytes()));
    }

    let mut out = ByteWriter::new();
    out.write_u32_be(MAGIC);
    out.write_u16_be(MINOR_VERSION);
    out.write_u16_be(MAJOR_VERSION);
    pool.write_to(&mut out)?;
    out.write_u16_be(ACC_MODULE);
    out.write_u16_be(this_class);
    out.write_u16_be(0); // super_class
    out.write_u16_be(0); // interfaces
    out.write_u16_be(0); // fields
    out.write_u16_be(0); // methods
    out.write_count("attributes", attributes.len())?;
    for (name, body) in attributes {
        out.write_u16_be(name);
        let len = u32::try_from(body.len()).map_err(|_| ModuleError::DescriptorTooLarge {
            what: "attribute body exceeds 4 GiB".to_string(),
        })?;
        out.write_u32_be(len);
        out.write_bytes(&body);
    }

    tracing::debug!(
        module = %descriptor.name,
        constants = pool.len(),
        bytes = out.len(),
        "encoded module descriptor"
    );
    Ok(out.into_bytes())
}

fn module_attribute(pool: &mut ConstantPool, descriptor: &Descriptor) -> Result<Vec<u8>> {
    let mut body = ByteWriter::new();

    body.write_u16_be(pool.module(&descriptor.name)?);
    // generated descriptors are always marked synthetic
    let flags = (if descriptor.open { ACC_OPEN } else { 0 }) | ACC_SYNTHETIC;
    body.write_u16_be(flags);
    body.write_u16_be(pool.optional_utf8(descriptor.version.as_deref())?);

    body.write_count("requires", descriptor.requires.len())?;
    for require in &descriptor.requires {
        body.write_u16_be(pool.module(&require.name)?);
        body.write_u16_be(requires_flags(&require.modifiers));
        body.write_u16_be(pool.optional_utf8(require.version.as_deref())?);
    }

    write_package_directives(pool, &mut body, "exports", &descriptor.exports)?;
    // an open module opens every package; its opens table must stay empty
    let opens: &[PackageDirective] = if descriptor.open {
        for open in &descriptor.opens {
            package_flags("opens", &open.modifiers)?;
        }
        &[]
    } else {
        &descriptor.opens
    };
    write_package_directives(pool, &mut body, "opens", opens)?;

    body.write_count("uses", descriptor.uses.len())?;
    for service in &descriptor.uses {
        body.write_u16_be(pool.class(service)?);
    }

    body.write_count("provides", descriptor.provides.len())?;
    for provide in &descriptor.provides {
        body.write_u16_be(pool.class(&provide.service)?);
        body.write_count("providers", provide.providers.len())?;
        for provider in &provide.providers {
            body.write_u16_be(pool.class(provider)?);
        }
    }

    Ok(body.into_bytes())
}

fn write_package_directives(
    pool: &mut ConstantPool,
    body: &mut ByteWriter,
    directive: &str,
    entries: &[PackageDirective],
) -> Result<()> {
    body.write_count(directive, entries.len())?;
    for entry in entries {
        body.write_u16_be(pool.package(&entry.source)?);
        body.write_u16_be(package_flags(directive, &entry.modifiers)?);
        body.write_count("targets", entry.targets.len())?;
        for target in &entry.targets {
            body.write_u16_be(pool.module(target)?);
        }
    }
    Ok(())
}

fn requires_flags(modifiers: &BTreeSet<Modifier>) -> u16 {
    modifiers.iter().fold(0, |flags, modifier| {
        flags
            | match modifier {
                Modifier::Transitive => ACC_TRANSITIVE,
                Modifier::Static => ACC_STATIC_PHASE,
                Modifier::Synthetic => ACC_SYNTHETIC,
                Modifier::Mandated => ACC_MANDATED,
            }
    })
}

fn package_flags(directive: &str, modifiers: &BTreeSet<Modifier>) -> Result<u16> {
    let mut flags = 0;
    for modifier in modifiers {
        flags |= match modifier {
            Modifier::Synthetic => ACC_SYNTHETIC,
            Modifier::Mandated => ACC_MANDATED,
            Modifier::Transitive | Modifier::Static => {
                return Err(ModuleError::InvalidModifierCombination {
                    directive: directive.to_string(),
                    modifier: modifier.to_string(),
                })
            }
        };
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Export, Open, Provide, Require};

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_be_bytes([bytes[at], bytes[at + 1]])
    }

    #[test]
    fn test_header() {
        let bytes = encode(&Descriptor::open_module("app")).unwrap();
        assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(u16_at(&bytes, 4), 0);
        assert_eq!(u16_at(&bytes, 6), 53);
    }

    #[test]
    fn test_minimal_layout() {
        let bytes = encode(&Descriptor::open_module("app")).unwrap();
        // pool: #1 "module-info", #2 Class #1, #3 "Module", #4 "app", #5 Module #4
        assert_eq!(u16_at(&bytes, 8), 6);
        let after_pool = 10 + (3 + 11) + 3 + (3 + 6) + (3 + 3) + 3;
        assert_eq!(u16_at(&bytes, after_pool), ACC_MODULE);
        assert_eq!(u16_at(&bytes, after_pool + 2), 2);
        assert_eq!(&bytes[after_pool + 4..after_pool + 12], &[0; 8]);
        assert_eq!(u16_at(&bytes, after_pool + 12), 1);

        let attr = after_pool + 14;
        assert_eq!(u16_at(&bytes, attr), 3);
        assert_eq!(&bytes[attr + 2..attr + 6], &[0, 0, 0, 16]);
        let body = &bytes[attr + 6..];
        assert_eq!(body.len(), 16);
        assert_eq!(u16_at(body, 0), 5);
        assert_eq!(u16_at(body, 2), ACC_OPEN | ACC_SYNTHETIC);
        assert_eq!(u16_at(body, 4), 0);
        assert!(body[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_closed_module_is_still_synthetic() {
        let bytes = encode(&Descriptor::new("app")).unwrap();
        let flags_at = bytes.len() - 16 + 2;
        assert_eq!(u16_at(&bytes, flags_at), ACC_SYNTHETIC);
    }

    #[test]
    fn test_repeated_names_share_one_constant() {
        let descriptor = Descriptor::new("app")
            .requires(Require::new("lib"))
            .exports(Export::new("app.api").to("lib"))
            .opens(Open::new("app.api").to("lib"));
        let mut pool = ConstantPool::new();
        let body = module_attribute(&mut pool, &descriptor).unwrap();

        let lib_in_requires = u16_at(&body, 8);
        // exports: count, package, flags, target count, target
        let export_package = u16_at(&body, 16);
        let export_target = u16_at(&body, 22);
        let open_package = u16_at(&body, 26);
        let open_target = u16_at(&body, 32);
        assert_eq!(lib_in_requires, export_target);
        assert_eq!(export_target, open_target);
        assert_eq!(export_package, open_package);
        assert_eq!(body.len(), 34 + 4);
    }

    #[test]
    fn test_open_module_writes_empty_opens_table() {
        let descriptor = Descriptor::open_module("app").opens(Open::new("app.model").to("lib"));
        let mut pool = ConstantPool::new();
        let body = module_attribute(&mut pool, &descriptor).unwrap();
        // name, flags, version, then requires/exports/opens/uses/provides counts
        assert_eq!(body.len(), 6 + 10);
        assert!(body[6..].iter().all(|&b| b == 0));

        let closed = Descriptor { open: false, ..descriptor };
        let body = module_attribute(&mut pool, &closed).unwrap();
        assert_eq!(u16_at(&body, 10), 1);
    }

    #[test]
    fn test_requires_modifier_bits() {
        let modifiers: BTreeSet<Modifier> =
            [Modifier::Transitive, Modifier::Static].into_iter().collect();
        assert_eq!(requires_flags(&modifiers), 0x0060);
        let modifiers: BTreeSet<Modifier> =
            [Modifier::Synthetic, Modifier::Mandated].into_iter().collect();
        assert_eq!(requires_flags(&modifiers), 0x9000);
    }

    #[test]
    fn test_transitive_export_is_rejected() {
        let descriptor = Descriptor::open_module("app")
            .exports(Export::new("app.api").with_modifier(Modifier::Transitive));
        let err = encode(&descriptor).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::InvalidModifierCombination { ref directive, ref modifier }
                if directive == "exports" && modifier == "transitive"
        ));
    }

    #[test]
    fn test_static_open_is_rejected() {
        let descriptor = Descriptor::open_module("app")
            .opens(Open::new("app.internal").with_modifier(Modifier::Static));
        assert!(matches!(
            encode(&descriptor),
            Err(ModuleError::InvalidModifierCombination { .. })
        ));
    }

    #[test]
    fn test_provider_order_is_kept() {
        let descriptor = Descriptor::open_module("app").provides(Provide::new(
            "app.spi.Codec",
            ["app.impl.Zeta", "app.impl.Alpha", "app.impl.Zeta"],
        ));
        let mut pool = ConstantPool::new();
        let body = module_attribute(&mut pool, &descriptor).unwrap();
        // name, flags, version, requires/exports/opens/uses counts
        let provides = 6 + 8;
        assert_eq!(u16_at(&body, provides), 1);
        assert_eq!(u16_at(&body, provides + 4), 3);
        let zeta = u16_at(&body, provides + 6);
        let alpha = u16_at(&body, provides + 8);
        assert_ne!(zeta, alpha);
        assert_eq!(u16_at(&body, provides + 10), zeta);
    }
}
