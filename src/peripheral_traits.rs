#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl Resolution {
    pub fn bits(self) -> u8 {
        match self {
            Resolution::Bits9 => 9,
            Resolution::Bits10 => 10,
            Resolution::Bits11 => 11,
            Resolution::Bits12 => 12,
        }
    }

    // Largest code a conversion can return at this width.
    pub fn max_code(self) -> u32 {
        (1u32 << self.bits()) - 1
    }
}

// Input attenuation of the ADC front end. Selects the full-scale voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attenuation {
    Db0,
    Db2_5,
    Db6,
    Db11,
}

impl Attenuation {
    pub fn full_scale_mv(self) -> u32 {
        match self {
            Attenuation::Db0 => 950,
            Attenuation::Db2_5 => 1250,
            Attenuation::Db6 => 1750,
            Attenuation::Db11 => 3300,
        }
    }
}

// Converts a raw code taken at `hardware` width into millivolts at the
// requested `resolution`. Low bits beyond `resolution` are dropped.
pub fn code_to_millivolts(
    code: u16,
    hardware: Resolution,
    resolution: Resolution,
    attenuation: Attenuation,
) -> u32 {
    let shift = hardware.bits().saturating_sub(resolution.bits());
    let code = (u32::from(code) >> shift).min(resolution.max_code());
    code * attenuation.full_scale_mv() / resolution.max_code()
}

// Something that can sample an analog input and report the result in millivolts.
// `configure` changes state shared by every channel on the converter, so the
// last call wins for all subsequent reads.
pub trait SampleSource {
    type Channel;
    type Error;

    fn configure(&mut self, resolution: Resolution, attenuation: Attenuation);

    // Blocks until one conversion is done.
    fn read_millivolts(&mut self, channel: &mut Self::Channel) -> Result<u32, Self::Error>;
}

impl<T: SampleSource + ?Sized> SampleSource for &mut T {
    type Channel = T::Channel;
    type Error = T::Error;

    fn configure(&mut self, resolution: Resolution, attenuation: Attenuation) {
        (**self).configure(resolution, attenuation);
    }

    fn read_millivolts(&mut self, channel: &mut Self::Channel) -> Result<u32, Self::Error> {
        (**self).read_millivolts(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_code_matches_width() {
        assert_eq!(Resolution::Bits9.max_code(), 511);
        assert_eq!(Resolution::Bits11.max_code(), 2047);
        assert_eq!(Resolution::Bits12.max_code(), 4095);
    }

    #[test]
    fn attenuation_widens_range() {
        let all = [
            Attenuation::Db0,
            Attenuation::Db2_5,
            Attenuation::Db6,
            Attenuation::Db11,
        ];
        for pair in all.windows(2) {
            assert!(pair[0].full_scale_mv() < pair[1].full_scale_mv());
        }
    }

    #[test]
    fn full_scale_code() {
        let mv = code_to_millivolts(4095, Resolution::Bits12, Resolution::Bits11, Attenuation::Db11);
        assert_eq!(mv, 3300);
        let mv = code_to_millivolts(4095, Resolution::Bits12, Resolution::Bits12, Attenuation::Db0);
        assert_eq!(mv, 950);
    }

    #[test]
    fn drops_low_bits() {
        // 2048 and 2049 both become 1024 at 11 bit
        let a = code_to_millivolts(2048, Resolution::Bits12, Resolution::Bits11, Attenuation::Db11);
        let b = code_to_millivolts(2049, Resolution::Bits12, Resolution::Bits11, Attenuation::Db11);
        assert_eq!(a, b);
        assert_eq!(a, 1024 * 3300 / 2047);
        assert_eq!(code_to_millivolts(0, Resolution::Bits12, Resolution::Bits11, Attenuation::Db11), 0);
    }

    #[test]
    fn out_of_range_code_clamps() {
        let mv = code_to_millivolts(u16::MAX, Resolution::Bits12, Resolution::Bits12, Attenuation::Db6);
        assert_eq!(mv, 1750);
    }

    struct Constant(u32);

    impl SampleSource for Constant {
        type Channel = u8;
        type Error = ();

        fn configure(&mut self, _: Resolution, _: Attenuation) {}

        fn read_millivolts(&mut self, channel: &mut u8) -> Result<u32, ()> {
            Ok(self.0 + *channel as u32)
        }
    }

    fn read_once<S: SampleSource>(mut source: S, channel: &mut S::Channel) -> Result<u32, S::Error> {
        source.read_millivolts(channel)
    }

    #[test]
    fn borrowed_source_forwards_reads() {
        let mut source = Constant(1000);
        let mut channel = 5;
        assert_eq!(read_once(&mut source, &mut channel), Ok(1005));
        assert_eq!(source.0, 1000);
    }
}
