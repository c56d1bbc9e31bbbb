//! # Protected-mode segment descriptor encoding
//!
//! A GDT entry is 8 bytes whose fields are scattered across the record:
//!
//! ```text
//!  63      56 55 54 53 52 51   48 47 46 45 44 43   40 39      32
//! +----------+--+--+--+---+-------+--+-----+--+-------+----------+
//! | base hi  |G |DB|L |AVL| lim hi|P | DPL |S | type  | base mid |
//! +----------+--+--+--+---+-------+--+-----+--+-------+----------+
//!  31                          16 15                            0
//! +------------------------------+-------------------------------+
//! |          base lo             |           limit lo            |
//! +------------------------------+-------------------------------+
//! ```
//!
//! In little-endian byte order the base occupies bytes 2–4 and 7, the limit
//! bytes 0–1 and the low nibble of byte 6, the access byte is byte 5 and the
//! flags are the high nibble of byte 6.
//!
//! [`DescriptorSpec`] is the field-level view; [`SegmentDescriptor`] the
//! packed 64-bit value. Both directions go through the shift/mask accessors of
//! [`DescriptorBits`], so no code here depends on struct layout rules.

use bitfield_struct::bitfield;
use core::fmt;
use kernel_info::memory::SEGMENT_PAGE_SIZE;

/// Bit layout of a code/data/system segment descriptor.
#[bitfield(u64)]
pub struct DescriptorBits {
    pub limit_lo: u16,             // [15:0]
    pub base_lo: u16,              // [31:16]
    pub base_mid: u8,              // [39:32]
    pub accessed: bool,            // [40]
    pub readable_writable: bool,   // [41]    R for code, W for data
    pub direction_conforming: bool, // [42]   C for code, E(xpand-down) for data
    pub executable: bool,          // [43]
    pub s: bool,                   // [44]    1 = code/data, 0 = system
    #[bits(2)]
    pub dpl: u8, // [46:45]
    pub p: bool,                   // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    pub avl: bool,                 // [52]
    pub l: bool,                   // [53]    64-bit code
    pub db: bool,                  // [54]    32-bit default operand size
    pub g: bool,                   // [55]    4 KiB limit granularity
    pub base_hi: u8,               // [63:56]
}

/// Unit in which the limit is counted.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Granularity {
    Byte,
    /// 4 KiB units.
    Page,
}

/// The `S` bit.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DescriptorType {
    /// TSS, LDT and gate descriptors.
    System,
    CodeOrData,
}

/// The `D/B` bit.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SizeFlag {
    Bits16,
    Bits32,
}

/// A descriptor input field exceeds its bit width.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("descriptor field `{field}` = {value:#x} exceeds maximum {max:#x}")]
    FieldOverflow {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// Field-level description of a segment descriptor.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct DescriptorSpec {
    pub base: u32,
    /// 20-bit segment limit.
    pub limit: u32,
    pub granularity: Granularity,
    pub present: bool,
    /// Descriptor privilege level, `0..=3`.
    pub privilege_level: u8,
    pub descriptor_type: DescriptorType,
    pub executable: bool,
    /// Readable for code segments, writable for data segments.
    pub readable_or_writable: bool,
    /// Conforming for code segments, expand-down for data segments.
    pub direction_or_conforming: bool,
    /// Set by the CPU on first use of the segment.
    pub accessed: bool,
    pub size_flag: SizeFlag,
    pub long_mode: bool,
    /// The AVL bit, free for system software.
    pub available: bool,
}

impl DescriptorSpec {
    pub const MAX_LIMIT: u32 = 0xF_FFFF;
    pub const MAX_PRIVILEGE_LEVEL: u8 = 3;

    /// Flat 4 GiB, 32-bit, present segment at the given privilege level.
    const fn flat(privilege_level: u8, executable: bool) -> Self {
        Self {
            base: 0,
            limit: Self::MAX_LIMIT,
            granularity: Granularity::Page,
            present: true,
            privilege_level,
            descriptor_type: DescriptorType::CodeOrData,
            executable,
            readable_or_writable: true,
            direction_or_conforming: false,
            accessed: false,
            size_flag: SizeFlag::Bits32,
            long_mode: false,
            available: false,
        }
    }

    /// Flat execute/read code segment.
    #[must_use]
    pub const fn flat_code(privilege_level: u8) -> Self {
        Self::flat(privilege_level, true)
    }

    /// Flat read/write data segment.
    #[must_use]
    pub const fn flat_data(privilege_level: u8) -> Self {
        Self::flat(privilege_level, false)
    }

    /// Highest valid offset into the segment.
    #[must_use]
    pub const fn effective_limit(&self) -> u64 {
        match self.granularity {
            Granularity::Byte => self.limit as u64,
            Granularity::Page => ((self.limit as u64) << 12) | (SEGMENT_PAGE_SIZE - 1),
        }
    }

    /// Number of addressable bytes, `effective_limit() + 1`.
    #[must_use]
    pub const fn span(&self) -> u64 {
        self.effective_limit() + 1
    }
}

/// A packed 8-byte segment descriptor as the CPU reads it from the GDT.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct SegmentDescriptor(u64);

impl SegmentDescriptor {
    /// The mandatory all-zero entry at index 0.
    pub const NULL: Self = Self(0);

    /// Pack `spec`, checking the limit and privilege level ranges.
    pub const fn encode(spec: &DescriptorSpec) -> Result<Self, DescriptorError> {
        if spec.limit > DescriptorSpec::MAX_LIMIT {
            return Err(DescriptorError::FieldOverflow {
                field: "limit",
                value: spec.limit,
                max: DescriptorSpec::MAX_LIMIT,
            });
        }
        if spec.privilege_level > DescriptorSpec::MAX_PRIVILEGE_LEVEL {
            return Err(DescriptorError::FieldOverflow {
                field: "privilege_level",
                value: spec.privilege_level as u32,
                max: DescriptorSpec::MAX_PRIVILEGE_LEVEL as u32,
            });
        }

        let bits = DescriptorBits::new()
            .with_limit_lo((spec.limit & 0xFFFF) as u16)
            .with_base_lo((spec.base & 0xFFFF) as u16)
            .with_base_mid(((spec.base >> 16) & 0xFF) as u8)
            .with_accessed(spec.accessed)
            .with_readable_writable(spec.readable_or_writable)
            .with_direction_conforming(spec.direction_or_conforming)
            .with_executable(spec.executable)
            .with_s(matches!(spec.descriptor_type, DescriptorType::CodeOrData))
            .with_dpl(spec.privilege_level)
            .with_p(spec.present)
            .with_limit_hi(((spec.limit >> 16) & 0xF) as u8)
            .with_avl(spec.available)
            .with_l(spec.long_mode)
            .with_db(matches!(spec.size_flag, SizeFlag::Bits32))
            .with_g(matches!(spec.granularity, Granularity::Page))
            .with_base_hi((spec.base >> 24) as u8);

        Ok(Self(bits.into_bits()))
    }

    /// Unpack into fields. Lossless for every raw value.
    #[must_use]
    pub const fn decode(self) -> DescriptorSpec {
        let bits = DescriptorBits::from_bits(self.0);
        DescriptorSpec {
            base: (bits.base_lo() as u32)
                | ((bits.base_mid() as u32) << 16)
                | ((bits.base_hi() as u32) << 24),
            limit: (bits.limit_lo() as u32) | ((bits.limit_hi() as u32) << 16),
            granularity: if bits.g() {
                Granularity::Page
            } else {
                Granularity::Byte
            },
            present: bits.p(),
            privilege_level: bits.dpl(),
            descriptor_type: if bits.s() {
                DescriptorType::CodeOrData
            } else {
                DescriptorType::System
            },
            executable: bits.executable(),
            readable_or_writable: bits.readable_writable(),
            direction_or_conforming: bits.direction_conforming(),
            accessed: bits.accessed(),
            size_flag: if bits.db() {
                SizeFlag::Bits32
            } else {
                SizeFlag::Bits16
            },
            long_mode: bits.l(),
            available: bits.avl(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw 64-bit encoding.
    #[inline]
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn from_bytes(raw: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(raw))
    }

    /// The 8 bytes in memory order.
    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Pack a descriptor into its 8 in-memory bytes.
pub const fn encode(spec: &DescriptorSpec) -> Result<[u8; 8], DescriptorError> {
    match SegmentDescriptor::encode(spec) {
        Ok(desc) => Ok(desc.to_bytes()),
        Err(e) => Err(e),
    }
}

/// Unpack 8 in-memory bytes into descriptor fields.
#[must_use]
pub const fn decode(raw: [u8; 8]) -> DescriptorSpec {
    SegmentDescriptor::from_bytes(raw).decode()
}

impl fmt::Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentDescriptor({:#018x})", self.0)
    }
}

/// One-line dump: raw value, base, G, D/B, AVL, limit, P, DPL, S and type nibble.
impl fmt::Display for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = DescriptorBits::from_bits(self.0);
        let spec = self.decode();
        let typ = (self.0 >> 40) & 0xF;
        write!(
            f,
            "{:#018x}: B:{:#x}, G:{}, DB:{}, AVL:{}, L:{:#x}, P:{}, DPL:{}, S:{}, T:{:#x}",
            self.0,
            spec.base,
            u8::from(bits.g()),
            u8::from(bits.db()),
            u8::from(bits.avl()),
            spec.limit,
            u8::from(bits.p()),
            bits.dpl(),
            u8::from(bits.s()),
            typ
        )
    }
}

// Size guards: each descriptor is exactly 8 bytes.
const _: () = {
    assert!(size_of::<DescriptorBits>() == 8);
    assert!(size_of::<SegmentDescriptor>() == 8);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_kernel_code_matches_reference_encoding() {
        let desc = SegmentDescriptor::encode(&DescriptorSpec::flat_code(0)).unwrap();
        assert_eq!(desc.to_u64(), 0x00CF_9A00_0000_FFFF);
    }

    #[test]
    fn flat_kernel_data_matches_reference_encoding() {
        let desc = SegmentDescriptor::encode(&DescriptorSpec::flat_data(0)).unwrap();
        assert_eq!(desc.to_u64(), 0x00CF_9200_0000_FFFF);
    }

    #[test]
    fn base_and_limit_are_split_across_bytes() {
        let spec = DescriptorSpec {
            base: 0x1234_5678,
            limit: 0xA_BCDE,
            granularity: Granularity::Byte,
            present: false,
            privilege_level: 0,
            descriptor_type: DescriptorType::System,
            executable: false,
            readable_or_writable: false,
            direction_or_conforming: false,
            accessed: false,
            size_flag: SizeFlag::Bits16,
            long_mode: false,
            available: false,
        };
        let raw = encode(&spec).unwrap();
        assert_eq!(raw[0..2], [0xDE, 0xBC]); // limit 15:0
        assert_eq!(raw[2..5], [0x78, 0x56, 0x34]); // base 23:0
        assert_eq!(raw[5], 0x00); // access byte
        assert_eq!(raw[6], 0x0A); // flags | limit 19:16
        assert_eq!(raw[7], 0x12); // base 31:24
        assert_eq!(decode(raw), spec);
    }

    #[test]
    fn access_and_flag_bits_land_in_place() {
        let spec = DescriptorSpec {
            privilege_level: 3,
            accessed: true,
            direction_or_conforming: true,
            available: true,
            ..DescriptorSpec::flat_code(0)
        };
        let raw = encode(&spec).unwrap();
        // P=1 DPL=3 S=1 E=1 C=1 R=1 A=1
        assert_eq!(raw[5], 0b1111_1111);
        // G=1 DB=1 L=0 AVL=1 | limit 19:16
        assert_eq!(raw[6], 0b1101_1111);

        let long = DescriptorSpec {
            long_mode: true,
            size_flag: SizeFlag::Bits16,
            ..DescriptorSpec::flat_code(0)
        };
        assert_eq!(encode(&long).unwrap()[6], 0b1010_1111);
    }

    #[test]
    fn decode_inverts_encode() {
        let bases = [0, 1, 0xFFFF, 0x1_0000, 0x00FF_FFFF, 0x0100_0000, 0xDEAD_BEEF, u32::MAX];
        let limits = [0, 1, 0xFFFF, 0x1_0000, 0xF_FFFF];

        for (i, &base) in bases.iter().enumerate() {
            for (j, &limit) in limits.iter().enumerate() {
                let n = i * limits.len() + j;
                let spec = DescriptorSpec {
                    base,
                    limit,
                    granularity: if n % 2 == 0 { Granularity::Page } else { Granularity::Byte },
                    present: n % 3 != 0,
                    privilege_level: (n % 4) as u8,
                    descriptor_type: if n % 5 == 0 {
                        DescriptorType::System
                    } else {
                        DescriptorType::CodeOrData
                    },
                    executable: n % 2 == 1,
                    readable_or_writable: n % 3 == 1,
                    direction_or_conforming: n % 7 == 0,
                    accessed: n % 4 == 2,
                    size_flag: if n % 3 == 2 { SizeFlag::Bits16 } else { SizeFlag::Bits32 },
                    long_mode: n % 6 == 5,
                    available: n % 5 == 3,
                };
                assert_eq!(decode(encode(&spec).unwrap()), spec, "{spec:?}");
            }
        }
    }

    #[test]
    fn encode_inverts_decode_for_arbitrary_raw_values() {
        // xorshift64; any fixed non-zero seed will do.
        let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..4096 {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let desc = SegmentDescriptor::from_u64(x);
            let again = SegmentDescriptor::encode(&desc.decode()).unwrap();
            assert_eq!(again, desc);
        }
    }

    #[test]
    fn limit_overflow_is_rejected() {
        let spec = DescriptorSpec {
            limit: 0x10_0000,
            ..DescriptorSpec::flat_data(0)
        };
        assert_eq!(
            SegmentDescriptor::encode(&spec),
            Err(DescriptorError::FieldOverflow {
                field: "limit",
                value: 0x10_0000,
                max: 0xF_FFFF,
            })
        );
    }

    #[test]
    fn privilege_overflow_is_rejected() {
        let spec = DescriptorSpec::flat_code(4);
        assert_eq!(
            encode(&spec),
            Err(DescriptorError::FieldOverflow {
                field: "privilege_level",
                value: 4,
                max: 3,
            })
        );
    }

    #[test]
    fn page_granular_flat_segment_spans_4_gib() {
        let spec = decode(encode(&DescriptorSpec::flat_data(0)).unwrap());
        assert_eq!(spec.effective_limit(), 0xFFFF_FFFF);
        assert_eq!(spec.span(), 1 << 32);

        let bytes = DescriptorSpec {
            granularity: Granularity::Byte,
            limit: 0xFFF,
            ..spec
        };
        assert_eq!(bytes.span(), 0x1000);
    }

    #[test]
    fn dump_reads_like_the_fields() {
        let desc = SegmentDescriptor::encode(&DescriptorSpec::flat_code(0)).unwrap();
        assert_eq!(
            desc.to_string(),
            "0x00cf9a000000ffff: B:0x0, G:1, DB:1, AVL:0, L:0xfffff, P:1, DPL:0, S:1, T:0xa"
        );
        assert!(SegmentDescriptor::NULL.is_null());
    }
}
