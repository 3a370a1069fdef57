use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
#[non_exhaustive]
/// Guest exception causes.
///
/// The discriminants are the architectural `mcause` codes, except for
/// [`Exception::Debug`], which is the out-of-band host debugger event and
/// never reaches the guest.
pub enum Exception {
    /// Instruction address misaligned.
    InstAddrMisaligned = 0x0,
    /// Instruction access fault.
    InstAccessFault = 0x1,
    /// Illegal instruction.
    IllegalInst = 0x2,
    /// Breakpoint (`EBREAK` or a host breakpoint).
    Breakpoint = 0x3,
    /// Load address misaligned.
    LoadAddrMisaligned = 0x4,
    /// Load access fault.
    LoadAccessFault = 0x5,
    /// Store/AMO address misaligned.
    StoreAmoAddrMisaligned = 0x6,
    /// Store/AMO access fault.
    StoreAmoAccessFault = 0x7,
    /// Environment call from U-mode. `ECALL` always raises this one; the
    /// trap handler promotes it to the current privilege level.
    UserEcall = 0x8,
    /// Environment call from S-mode.
    SupervisorEcall = 0x9,
    /// Environment call from H-mode.
    HypervisorEcall = 0xa,
    /// Environment call from M-mode.
    MachineEcall = 0xb,
    /// Instruction page fault.
    InstPageFault = 0xc,
    /// Load page fault.
    LoadPageFault = 0xd,
    /// Store/AMO page fault.
    StorePageFault = 0xf,
    /// Host debug event (single-step or breakpoint stop).
    Debug = 0x10002,
}

impl Exception {
    /// The raw cause code.
    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Exception {}

impl From<Exception> for u32 {
    fn from(excp: Exception) -> u32 {
        excp.code()
    }
}

impl TryFrom<u32> for Exception {
    type Error = ();

    fn try_from(code: u32) -> Result<Self, ()> {
        use Exception::*;
        Ok(match code {
            0x0 => InstAddrMisaligned,
            0x1 => InstAccessFault,
            0x2 => IllegalInst,
            0x3 => Breakpoint,
            0x4 => LoadAddrMisaligned,
            0x5 => LoadAccessFault,
            0x6 => StoreAmoAddrMisaligned,
            0x7 => StoreAmoAccessFault,
            0x8 => UserEcall,
            0x9 => SupervisorEcall,
            0xa => HypervisorEcall,
            0xb => MachineEcall,
            0xc => InstPageFault,
            0xd => LoadPageFault,
            0xf => StorePageFault,
            0x10002 => Debug,
            _ => return Err(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn cause_codes_round_trip() {
        for excp in Exception::iter() {
            assert_eq!(Exception::try_from(excp.code()), Ok(excp));
        }
        assert_eq!(Exception::try_from(0xe), Err(()));
        assert_eq!(Exception::try_from(0x100), Err(()));
    }
}
