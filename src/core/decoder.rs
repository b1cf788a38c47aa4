//! `module-info.class` bytes -> descriptor model. Structural inverse of the
//! encoder, but tolerant of anything a compiler may add around the `Module`
//! attribute (other constants, unknown attributes).

use crate::core::classfile::{
    binary_name, ByteReader, ACC_MANDATED, ACC_MODULE, ACC_OPEN, ACC_STATIC_PHASE, ACC_SYNTHETIC,
    ACC_TRANSITIVE, ATTR_MODULE, ATTR_MODULE_MAIN_CLASS, ATTR_MODULE_PACKAGES, CONSTANT_CLASS,
    CONSTANT_DOUBLE, CONSTANT_DYNAMIC, CONSTANT_FIELDREF, CONSTANT_FLOAT, CONSTANT_INTEGER,
    CONSTANT_INTERFACE_METHODREF, CONSTANT_INVOKE_DYNAMIC, CONSTANT_LONG, CONSTANT_METHODREF,
    CONSTANT_METHOD_HANDLE, CONSTANT_METHOD_TYPE, CONSTANT_MODULE, CONSTANT_NAME_AND_TYPE,
    CONSTANT_PACKAGE, CONSTANT_STRING, CONSTANT_UTF8, MAGIC, MAJOR_VERSION, MODULE_FLAGS_MASK,
    PACKAGE_FLAGS_MASK, REQUIRES_FLAGS_MASK,
};
use crate::core::mutf8;
use crate::domain::model::{Descriptor, Modifier, PackageDirective, Provide, Require};
use crate::utils::error::{ModuleError, Result};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Entry {
    Utf8(String),
    Class(u16),
    Module(u16),
    Package(u16),
    Other,
}

struct Constants {
    entries: Vec<Option<Entry>>,
}

impl Constants {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let count = reader.read_u16_be()? as usize;
        if count == 0 {
            return Err(ModuleError::malformed_binary("constant pool count is zero"));
        }
        let mut entries: Vec<Option<Entry>> = Vec::with_capacity(count);
        entries.push(None);
        while entries.len() < count {
            let tag = reader.read_u8()?;
            let entry = match tag {
                CONSTANT_UTF8 => {
                    let len = reader.read_u16_be()? as usize;
                    let bytes = reader.read_bytes(len)?;
                    let value = mutf8::decode(bytes).ok_or_else(|| {
                        ModuleError::malformed_binary(format!(
                            "invalid modified UTF-8 in constant #{}",
                            entries.len()
                        ))
                    })?;
                    Entry::Utf8(value)
                }
                CONSTANT_CLASS => Entry::Class(reader.read_u16_be()?),
                CONSTANT_MODULE => Entry::Module(reader.read_u16_be()?),
                CONSTANT_PACKAGE => Entry::Package(reader.read_u16_be()?),
                CONSTANT_STRING | CONSTANT_METHOD_TYPE => {
                    reader.skip(2)?;
                    Entry::Other
                }
                CONSTANT_METHOD_HANDLE => {
                    reader.skip(3)?;
                    Entry::Other
                }
                CONSTANT_INTEGER
                | CONSTANT_FLOAT
                | CONSTANT_FIELDREF
                | CONSTANT_METHODREF
                | CONSTANT_INTERFACE_METHODREF
                | CONSTANT_NAME_AND_TYPE
                | CONSTANT_DYNAMIC
                | CONSTANT_INVOKE_DYNAMIC => {
                    reader.skip(4)?;
                    Entry::Other
                }
                CONSTANT_LONG | CONSTANT_DOUBLE => {
                    reader.skip(8)?;
                    // eight-byte constants take two slots
                    entries.push(Some(Entry::Other));
                    Entry::Other
                }
                other => {
                    return Err(ModuleError::malformed_binary(format!(
                        "unknown constant tag {} at offset {}",
                        other,
                        reader.position() - 1
                    )))
                }
            };
            entries.push(Some(entry));
        }
        if entries.len() != count {
            return Err(ModuleError::malformed_binary(
                "eight-byte constant overruns the constant pool",
            ));
        }
        Ok(Self { entries })
    }

    fn entry(&self, idx: u16) -> Result<&Entry> {
        self.entries
            .get(idx as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                ModuleError::malformed_binary(format!("invalid constant pool index {}", idx))
            })
    }

    fn utf8(&self, idx: u16) -> Result<&str> {
        match self.entry(idx)? {
            Entry::Utf8(value) => Ok(value),
            other => Err(unexpected(idx, "Utf8", other)),
        }
    }

    fn optional_utf8(&self, idx: u16) -> Result<Option<String>> {
        if idx == 0 {
            return Ok(None);
        }
        self.utf8(idx).map(|s| Some(s.to_string()))
    }

    fn class(&self, idx: u16) -> Result<String> {
        match self.entry(idx)? {
            Entry::Class(name) => Ok(binary_name(self.utf8(*name)?)),
            other => Err(unexpected(idx, "Class", other)),
        }
    }

    fn module(&self, idx: u16) -> Result<String> {
        match self.entry(idx)? {
            Entry::Module(name) => Ok(self.utf8(*name)?.to_string()),
            other => Err(unexpected(idx, "Module", other)),
        }
    }

    fn package(&self, idx: u16) -> Result<String> {
        match self.entry(idx)? {
            Entry::Package(name) => Ok(binary_name(self.utf8(*name)?)),
            other => Err(unexpected(idx, "Package", other)),
        }
    }
}

fn unexpected(idx: u16, expected: &str, found: &Entry) -> ModuleError {
    ModuleError::malformed_binary(format!(
        "constant #{} should be {}, found {:?}",
        idx, expected, found
    ))
}

pub fn decode(bytes: &[u8]) -> Result<Descriptor> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.read_u32_be()?;
    if magic != MAGIC {
        return Err(ModuleError::malformed_binary(format!(
            "bad magic number 0x{:08X}",
            magic
        )));
    }
    let minor = reader.read_u16_be()?;
    let major = reader.read_u16_be()?;
    if major < MAJOR_VERSION {
        return Err(ModuleError::malformed_binary(format!(
            "format version {}.{} predates module descriptors",
            major, minor
        )));
    }

    let constants = Constants::read(&mut reader)?;

    let access_flags = reader.read_u16_be()?;
    if access_flags & ACC_MODULE == 0 {
        return Err(ModuleError::malformed_binary(
            "ACC_MODULE is not set; not a module descriptor",
        ));
    }
    reader.skip(4)?; // this_class, super_class
    let interfaces = reader.read_u16_be()? as usize;
    reader.skip(interfaces * 2)?;
    skip_members(&mut reader)?; // fields
    skip_members(&mut reader)?; // methods

    let mut descriptor = None;
    let mut packages = BTreeSet::new();
    let mut main_class = None;

    let attributes = reader.read_u16_be()?;
    for _ in 0..attributes {
        let name_idx = reader.read_u16_be()?;
        let len = reader.read_u32_be()? as usize;
        let body = reader.read_bytes(len)?;
        let name = constants.utf8(name_idx)?;
        let mut body_reader = ByteReader::new(body);
        match name {
            ATTR_MODULE => {
                if descriptor.is_some() {
                    return Err(ModuleError::malformed_binary("duplicate Module attribute"));
                }
                descriptor = Some(read_module(&constants, &mut body_reader)?);
            }
            ATTR_MODULE_PACKAGES => {
                let count = body_reader.read_u16_be()?;
                for _ in 0..count {
                    packages.insert(constants.package(body_reader.read_u16_be()?)?);
                }
            }
            ATTR_MODULE_MAIN_CLASS => {
                main_class = Some(constants.class(body_reader.read_u16_be()?)?);
            }
            other => {
                tracing::trace!(attribute = other, "skipping attribute");
                continue;
            }
        }
        if body_reader.remaining() != 0 {
            return Err(ModuleError::malformed_binary(format!(
                "{} trailing bytes in {} attribute",
                body_reader.remaining(),
                name
            )));
        }
    }

    if reader.remaining() != 0 {
        return Err(ModuleError::malformed_binary(format!(
            "{} trailing bytes after attributes",
            reader.remaining()
        )));
    }

    let mut descriptor =
        descriptor.ok_or_else(|| ModuleError::malformed_binary("no Module attribute"))?;
    descriptor.packages = packages;
    descriptor.main_class = main_class;
    Ok(descriptor)
}

fn skip_members(reader: &mut ByteReader<'_>) -> Result<()> {
    let count = reader.read_u16_be()?;
    for _ in 0..count {
        reader.skip(6)?; // access_flags, name_index, descriptor_index
        let attributes = reader.read_u16_be()?;
        for _ in 0..attributes {
            reader.skip(2)?;
            let len = reader.read_u32_be()? as usize;
            reader.skip(len)?;
        }
    }
    Ok(())
}

fn read_module(constants: &Constants, reader: &mut ByteReader<'_>) -> Result<Descriptor> {
    let name = constants.module(reader.read_u16_be()?)?;
    let flags = checked_flags("module", reader.read_u16_be()?, MODULE_FLAGS_MASK)?;
    let mut descriptor = Descriptor::new(name);
    descriptor.open = flags & ACC_OPEN != 0;
    descriptor.version = constants.optional_utf8(reader.read_u16_be()?)?;

    let count = reader.read_u16_be()?;
    for _ in 0..count {
        let name = constants.module(reader.read_u16_be()?)?;
        let flags = checked_flags("requires", reader.read_u16_be()?, REQUIRES_FLAGS_MASK)?;
        let version = constants.optional_utf8(reader.read_u16_be()?)?;
        let mut modifiers = BTreeSet::new();
        for (bit, modifier) in [
            (ACC_TRANSITIVE, Modifier::Transitive),
            (ACC_STATIC_PHASE, Modifier::Static),
            (ACC_SYNTHETIC, Modifier::Synthetic),
            (ACC_MANDATED, Modifier::Mandated),
        ] {
            if flags & bit != 0 {
                modifiers.insert(modifier);
            }
        }
        descriptor.requires.push(Require {
            name,
            modifiers,
            version,
        });
    }

    descriptor.exports = read_package_directives(constants, reader, "exports")?;
    descriptor.opens = read_package_directives(constants, reader, "opens")?;

    let count = reader.read_u16_be()?;
    for _ in 0..count {
        descriptor.uses.insert(constants.class(reader.read_u16_be()?)?);
    }

    let count = reader.read_u16_be()?;
    for _ in 0..count {
        let service = constants.class(reader.read_u16_be()?)?;
        let with = reader.read_u16_be()?;
        let providers = (0..with)
            .map(|_| constants.class(reader.read_u16_be()?))
            .collect::<Result<Vec<_>>>()?;
        descriptor.provides.push(Provide { service, providers });
    }

    Ok(descriptor)
}

fn read_package_directives(
    constants: &Constants,
    reader: &mut ByteReader<'_>,
    directive: &str,
) -> Result<Vec<PackageDirective>> {
    let count = reader.read_u16_be()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let source = constants.package(reader.read_u16_be()?)?;
        let flags = checked_flags(directive, reader.read_u16_be()?, PACKAGE_FLAGS_MASK)?;
        let mut modifiers = BTreeSet::new();
        if flags & ACC_SYNTHETIC != 0 {
            modifiers.insert(Modifier::Synthetic);
        }
        if flags & ACC_MANDATED != 0 {
            modifiers.insert(Modifier::Mandated);
        }
        let to = reader.read_u16_be()?;
        let targets = (0..to)
            .map(|_| constants.module(reader.read_u16_be()?))
            .collect::<Result<BTreeSet<_>>>()?;
        entries.push(PackageDirective {
            source,
            modifiers,
            targets,
        });
    }
    Ok(entries)
}

fn checked_flags(directive: &str, flags: u16, mask: u16) -> Result<u16> {
    if flags & !mask != 0 {
        return Err(ModuleError::malformed_binary(format!(
            "unknown {} flag bits 0x{:04X}",
            directive,
            flags & !mask
        )));
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::encode;
    use crate::domain::model::{Export, Open};

    fn sample() -> Descriptor {
        let mut descriptor = Descriptor::new("com.example.app")
            .requires(Require::new("java.base").with_modifier(Modifier::Mandated))
            .requires(
                Require::new("java.logging")
                    .with_modifier(Modifier::Transitive)
                    .with_modifier(Modifier::Static),
            )
            .exports(Export::new("com.example.app.api"))
            .exports(
                Export::new("com.example.app.spi")
                    .to("com.example.plugin")
                    .to("com.example.tests"),
            )
            .opens(Open::new("com.example.app.model").with_modifier(Modifier::Synthetic))
            .uses("com.example.app.spi.Codec")
            .provides(Provide::new(
                "com.example.app.spi.Codec",
                ["com.example.app.codec.Json", "com.example.app.codec.Cbor"],
            ));
        descriptor.version = Some("1.2.0".to_string());
        descriptor.main_class = Some("com.example.app.Main".to_string());
        descriptor.requires[0].version = Some("17".to_string());
        descriptor.packages.insert("com.example.app.internal".to_string());
        descriptor
    }

    #[test]
    fn test_round_trip() {
        let descriptor = sample();
        let decoded = decode(&encode(&descriptor).unwrap()).unwrap();
        assert_eq!(decoded, descriptor);
        assert_eq!(
            decoded.provides[0].providers,
            vec!["com.example.app.codec.Json", "com.example.app.codec.Cbor"]
        );
    }

    #[test]
    fn test_round_trip_open_module() {
        let descriptor = Descriptor::open_module("plain")
            .requires(Require::new("java.base"))
            .exports(Export::new("plain.api"));
        assert_eq!(decode(&encode(&descriptor).unwrap()).unwrap(), descriptor);
    }

    #[test]
    fn test_open_module_decodes_without_opens() {
        let mut descriptor = sample();
        descriptor.open = true;
        let decoded = decode(&encode(&descriptor).unwrap()).unwrap();
        assert!(decoded.open);
        assert!(decoded.opens.is_empty());
        assert_eq!(decoded.exports, descriptor.exports);
        assert_eq!(decoded.packages, descriptor.packages);
    }

    #[test]
    fn test_duplicate_module_attribute_rejected() {
        let mut bytes = encode(&Descriptor::new("app")).unwrap();
        // attribute count, then one Module attribute: name, length, 16-byte body
        let attribute = bytes[bytes.len() - 22..].to_vec();
        let count_at = bytes.len() - 24;
        assert_eq!(&bytes[count_at..count_at + 2], &[0, 1]);
        bytes[count_at + 1] = 2;
        bytes.extend_from_slice(&attribute);

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ModuleError::MalformedDescriptorBinary { .. }));
        assert!(err.to_string().contains("duplicate Module attribute"));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = 0xCB;
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_old_version_rejected() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[7] = 52;
        assert!(matches!(
            decode(&bytes),
            Err(ModuleError::MalformedDescriptorBinary { .. })
        ));
    }

    #[test]
    fn test_truncated_input_at_every_length() {
        let bytes = encode(&sample()).unwrap();
        for len in 0..bytes.len() {
            assert!(
                matches!(
                    decode(&bytes[..len]),
                    Err(ModuleError::MalformedDescriptorBinary { .. })
                ),
                "prefix of {} bytes decoded",
                len
            );
        }
    }

    #[test]
    fn test_unknown_module_flag_bits() {
        let descriptor = Descriptor::new("m");
        let mut bytes = encode(&descriptor).unwrap();
        // module attribute is the last 16 bytes; flags follow the name index
        let at = bytes.len() - 16 + 2;
        bytes[at + 1] |= 0x01;
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("module flag bits"));
    }

    #[test]
    fn test_missing_module_attribute() {
        let mut bytes = encode(&Descriptor::new("m")).unwrap();
        // drop the only attribute
        let attributes_count_at = bytes.len() - 16 - 6 - 2;
        bytes.truncate(attributes_count_at);
        bytes.extend_from_slice(&[0, 0]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("no Module attribute"));
    }
}
