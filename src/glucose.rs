use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{
    codec::{ByteOrder, Reader},
    error::{ensure_len, Result},
    types::{split_type_location, DateTime, SampleLocation, SampleType},
};

const FLAG_TIME_OFFSET: u8 = 0x01;
const FLAG_CONCENTRATION: u8 = 0x02;
const FLAG_MOL_PER_L: u8 = 0x04;
const FLAG_STATUS: u8 = 0x08;
const FLAG_CONTEXT_FOLLOWS: u8 = 0x10;

const CONTEXT_FLAG_CARBOHYDRATE: u8 = 0x01;
const CONTEXT_FLAG_MEAL: u8 = 0x02;
const CONTEXT_FLAG_TESTER_HEALTH: u8 = 0x04;
const CONTEXT_FLAG_EXERCISE: u8 = 0x08;
const CONTEXT_FLAG_MEDICATION: u8 = 0x10;
const CONTEXT_FLAG_MEDICATION_LITERS: u8 = 0x20;
const CONTEXT_FLAG_HBA1C: u8 = 0x40;
const CONTEXT_FLAG_EXTENDED: u8 = 0x80;

/// Concentration unit selected by flags bit 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcentrationUnit {
    /// Kilograms per litre
    KgPerL,
    /// Moles per litre
    MolPerL,
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KgPerL => write!(f, "kg/L"),
            Self::MolPerL => write!(f, "mol/L"),
        }
    }
}

/// Glucose concentration with its sample description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseConcentration {
    /// Value in `unit` as transmitted
    pub value: f32,
    /// Unit of `value`
    pub unit: ConcentrationUnit,
    /// Sample type
    pub sample_type: SampleType,
    /// Sample location
    pub sample_location: SampleLocation,
}

impl GlucoseConcentration {
    /// Value in mg/dL, if the unit is kg/L
    #[must_use]
    pub fn mg_per_dl(&self) -> Option<f32> {
        (self.unit == ConcentrationUnit::KgPerL).then(|| self.value * 100_000.0)
    }

    /// Value in mmol/L, if the unit is mol/L
    #[must_use]
    pub fn mmol_per_l(&self) -> Option<f32> {
        (self.unit == ConcentrationUnit::MolPerL).then(|| self.value * 1000.0)
    }
}

/// Sensor Status Annunciation of a glucose measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GlucoseStatus(pub u16);

impl GlucoseStatus {
    /// Device battery low at time of measurement
    #[must_use]
    pub const fn device_battery_low(self) -> bool {
        self.0 & 0x0001 != 0
    }

    /// Sensor malfunction or faulting at time of measurement
    #[must_use]
    pub const fn sensor_malfunction(self) -> bool {
        self.0 & 0x0002 != 0
    }

    /// Sample size for blood or control solution insufficient
    #[must_use]
    pub const fn sample_size_insufficient(self) -> bool {
        self.0 & 0x0004 != 0
    }

    /// Strip insertion error
    #[must_use]
    pub const fn strip_insertion_error(self) -> bool {
        self.0 & 0x0008 != 0
    }

    /// Strip type incorrect for device
    #[must_use]
    pub const fn strip_type_incorrect(self) -> bool {
        self.0 & 0x0010 != 0
    }

    /// Sensor result higher than the device can process
    #[must_use]
    pub const fn result_too_high(self) -> bool {
        self.0 & 0x0020 != 0
    }

    /// Sensor result lower than the device can process
    #[must_use]
    pub const fn result_too_low(self) -> bool {
        self.0 & 0x0040 != 0
    }

    /// Sensor temperature too high for valid test
    #[must_use]
    pub const fn temperature_too_high(self) -> bool {
        self.0 & 0x0080 != 0
    }

    /// Sensor temperature too low for valid test
    #[must_use]
    pub const fn temperature_too_low(self) -> bool {
        self.0 & 0x0100 != 0
    }

    /// Sensor read interrupted because the strip was pulled too soon
    #[must_use]
    pub const fn read_interrupted(self) -> bool {
        self.0 & 0x0200 != 0
    }

    /// General device fault
    #[must_use]
    pub const fn general_device_fault(self) -> bool {
        self.0 & 0x0400 != 0
    }

    /// Time fault, the timestamp may be inaccurate
    #[must_use]
    pub const fn time_fault(self) -> bool {
        self.0 & 0x0800 != 0
    }
}

/// Glucose Measurement record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseMeasurement {
    /// Record sequence number
    pub sequence_number: u16,
    /// Base time of the record
    pub base_time: DateTime,
    /// Offset from the base time in minutes
    pub time_offset: Option<i16>,
    /// Measured concentration
    pub concentration: Option<GlucoseConcentration>,
    /// Sensor status annunciation
    pub status: Option<GlucoseStatus>,
    /// A Glucose Measurement Context with the same sequence number follows
    pub context_follows: bool,
}

impl GlucoseMeasurement {
    /// Decode a Glucose Measurement notification
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::InsufficientData`] if the frame is shorter
    /// than its flags require.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode with multi-byte fields in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected glucose measurement {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 3 + DateTime::SIZE)?;
        let flags = data[0];

        let mut required = 3 + DateTime::SIZE;
        if flags & FLAG_TIME_OFFSET != 0 {
            required += 2;
        }
        if flags & FLAG_CONCENTRATION != 0 {
            required += 3;
        }
        if flags & FLAG_STATUS != 0 {
            required += 2;
        }
        ensure_len(data, required)?;

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;
        let sequence_number = reader.u16()?;
        let base_time = DateTime::read(&mut reader)?;

        let time_offset = if flags & FLAG_TIME_OFFSET != 0 {
            Some(reader.i16()?)
        } else {
            None
        };

        let concentration = if flags & FLAG_CONCENTRATION != 0 {
            let value = reader.sfloat()?;
            let (sample_type, sample_location) = split_type_location(reader.u8()?);
            let unit = if flags & FLAG_MOL_PER_L == 0 {
                ConcentrationUnit::KgPerL
            } else {
                ConcentrationUnit::MolPerL
            };
            Some(GlucoseConcentration {
                value,
                unit,
                sample_type,
                sample_location,
            })
        } else {
            None
        };

        let status = if flags & FLAG_STATUS != 0 {
            Some(GlucoseStatus(reader.u16()?))
        } else {
            None
        };

        Ok(Self {
            sequence_number,
            base_time,
            time_offset,
            concentration,
            status,
            context_follows: flags & FLAG_CONTEXT_FOLLOWS != 0,
        })
    }
}

macro_rules! coded_enum {
    (
        $(#[$doc:meta])*
        $name:ident { $($(#[$vdoc:meta])* $variant:ident = $code:literal => $label:literal,)* }
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vdoc])* $variant,)*
            /// Reserved value
            Unknown(u8),
        }

        impl From<u8> for $name {
            fn from(value: u8) -> Self {
                match value {
                    $($code => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $label),)*
                    Self::Unknown(value) => write!(f, "Unknown ({value})"),
                }
            }
        }
    };
}

coded_enum! {
    /// Carbohydrate ID
    Carbohydrate {
        /// Breakfast
        Breakfast = 1 => "Breakfast",
        /// Lunch
        Lunch = 2 => "Lunch",
        /// Dinner
        Dinner = 3 => "Dinner",
        /// Snack
        Snack = 4 => "Snack",
        /// Drink
        Drink = 5 => "Drink",
        /// Supper
        Supper = 6 => "Supper",
        /// Brunch
        Brunch = 7 => "Brunch",
    }
}

coded_enum! {
    /// Meal context
    Meal {
        /// Before meal
        Preprandial = 1 => "Preprandial (before meal)",
        /// After meal
        Postprandial = 2 => "Postprandial (after meal)",
        /// Fasting
        Fasting = 3 => "Fasting",
        /// Casual (snacks, drinks)
        Casual = 4 => "Casual (snacks, drinks, etc.)",
        /// Bedtime
        Bedtime = 5 => "Bedtime",
    }
}

coded_enum! {
    /// Who performed the test
    Tester {
        /// Self
        SelfTest = 1 => "Self",
        /// Health care professional
        HealthCareProfessional = 2 => "Health Care Professional",
        /// Lab test
        LabTest = 3 => "Lab test",
        /// Tester value not available
        NotAvailable = 15 => "Tester value not available",
    }
}

coded_enum! {
    /// Health condition at the time of the test
    Health {
        /// Minor health issues
        MinorIssues = 1 => "Minor health issues",
        /// Major health issues
        MajorIssues = 2 => "Major health issues",
        /// During menses
        DuringMenses = 3 => "During menses",
        /// Under stress
        UnderStress = 4 => "Under stress",
        /// No health issues
        NoIssues = 5 => "No health issues",
        /// Health value not available
        NotAvailable = 15 => "Health value not available",
    }
}

coded_enum! {
    /// Medication ID
    Medication {
        /// Rapid acting insulin
        RapidActingInsulin = 1 => "Rapid acting insulin",
        /// Short acting insulin
        ShortActingInsulin = 2 => "Short acting insulin",
        /// Intermediate acting insulin
        IntermediateActingInsulin = 3 => "Intermediate acting insulin",
        /// Long acting insulin
        LongActingInsulin = 4 => "Long acting insulin",
        /// Pre-mixed insulin
        PreMixedInsulin = 5 => "Pre-mixed insulin",
    }
}

/// Carbohydrate intake
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbohydrateIntake {
    /// Meal the carbohydrates belong to
    pub kind: Carbohydrate,
    /// Amount in kilograms
    pub amount_kg: f32,
}

/// Exercise before the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exercise {
    /// Duration in seconds (65535 = overrun)
    pub duration: u16,
    /// Intensity in percent
    pub intensity: u8,
}

/// Unit of a medication amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MedicationUnit {
    /// Kilograms
    Kilograms,
    /// Litres
    Liters,
}

/// Medication taken
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedicationIntake {
    /// Medication kind
    pub kind: Medication,
    /// Amount in `unit`
    pub amount: f32,
    /// Unit of `amount`
    pub unit: MedicationUnit,
}

/// Glucose Measurement Context record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseContext {
    /// Sequence number of the measurement this context belongs to
    pub sequence_number: u16,
    /// Extended flags byte, reserved for future use
    pub extended_flags: Option<u8>,
    /// Carbohydrate intake
    pub carbohydrate: Option<CarbohydrateIntake>,
    /// Meal context
    pub meal: Option<Meal>,
    /// Tester
    pub tester: Option<Tester>,
    /// Health condition
    pub health: Option<Health>,
    /// Exercise before the test
    pub exercise: Option<Exercise>,
    /// Medication taken
    pub medication: Option<MedicationIntake>,
    /// HbA1c in percent
    pub hba1c: Option<f32>,
}

impl GlucoseContext {
    /// Decode a Glucose Measurement Context notification
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::InsufficientData`] if the frame is shorter
    /// than its flags require.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode with multi-byte fields in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected glucose context {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 3)?;
        let flags = data[0];

        let sizes = [
            (CONTEXT_FLAG_EXTENDED, 1),
            (CONTEXT_FLAG_CARBOHYDRATE, 3),
            (CONTEXT_FLAG_MEAL, 1),
            (CONTEXT_FLAG_TESTER_HEALTH, 1),
            (CONTEXT_FLAG_EXERCISE, 3),
            (CONTEXT_FLAG_MEDICATION, 3),
            (CONTEXT_FLAG_HBA1C, 2),
        ];
        let required = 3 + sizes
            .iter()
            .filter(|(flag, _)| flags & flag != 0)
            .map(|(_, size)| size)
            .sum::<usize>();
        ensure_len(data, required)?;

        let mut reader = Reader::with_order(data, order);
        reader.skip(1)?;
        let sequence_number = reader.u16()?;

        let extended_flags = if flags & CONTEXT_FLAG_EXTENDED != 0 {
            Some(reader.u8()?)
        } else {
            None
        };

        let carbohydrate = if flags & CONTEXT_FLAG_CARBOHYDRATE != 0 {
            Some(CarbohydrateIntake {
                kind: Carbohydrate::from(reader.u8()?),
                amount_kg: reader.sfloat()?,
            })
        } else {
            None
        };

        let meal = if flags & CONTEXT_FLAG_MEAL != 0 {
            Some(Meal::from(reader.u8()?))
        } else {
            None
        };

        let (tester, health) = if flags & CONTEXT_FLAG_TESTER_HEALTH != 0 {
            let octet = reader.u8()?;
            (
                Some(Tester::from(octet & 0x0F)),
                Some(Health::from(octet >> 4)),
            )
        } else {
            (None, None)
        };

        let exercise = if flags & CONTEXT_FLAG_EXERCISE != 0 {
            Some(Exercise {
                duration: reader.u16()?,
                intensity: reader.u8()?,
            })
        } else {
            None
        };

        let medication = if flags & CONTEXT_FLAG_MEDICATION != 0 {
            let kind = Medication::from(reader.u8()?);
            let amount = reader.sfloat()?;
            let unit = if flags & CONTEXT_FLAG_MEDICATION_LITERS == 0 {
                MedicationUnit::Kilograms
            } else {
                MedicationUnit::Liters
            };
            Some(MedicationIntake { kind, amount, unit })
        } else {
            None
        };

        let hba1c = if flags & CONTEXT_FLAG_HBA1C != 0 {
            Some(reader.sfloat()?)
        } else {
            None
        };

        Ok(Self {
            sequence_number,
            extended_flags,
            carbohydrate,
            meal,
            tester,
            health,
            exercise,
            medication,
            hba1c,
        })
    }
}

/// Glucose Feature bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GlucoseFeature(pub u16);

impl GlucoseFeature {
    /// Decode a Glucose Feature read
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::InsufficientData`] for frames under two bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_order(data, ByteOrder::LittleEndian)
    }

    /// Decode a Glucose Feature read in the given byte order
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_order(data: &[u8], order: ByteOrder) -> Result<Self> {
        Self::decode(data, order)
            .inspect_err(|e| debug!("Rejected glucose feature {:02X?}: {}", data, e))
    }

    fn decode(data: &[u8], order: ByteOrder) -> Result<Self> {
        ensure_len(data, 2)?;
        Ok(Self(Reader::with_order(data, order).u16()?))
    }

    /// Low battery detection during measurement supported
    #[must_use]
    pub const fn low_battery_detection(self) -> bool {
        self.0 & 0x0001 != 0
    }

    /// Sensor malfunction detection supported
    #[must_use]
    pub const fn sensor_malfunction_detection(self) -> bool {
        self.0 & 0x0002 != 0
    }

    /// Sensor sample size supported
    #[must_use]
    pub const fn sensor_sample_size(self) -> bool {
        self.0 & 0x0004 != 0
    }

    /// Sensor strip insertion error detection supported
    #[must_use]
    pub const fn strip_insertion_error_detection(self) -> bool {
        self.0 & 0x0008 != 0
    }

    /// Sensor strip type error detection supported
    #[must_use]
    pub const fn strip_type_error_detection(self) -> bool {
        self.0 & 0x0010 != 0
    }

    /// Sensor result high-low detection supported
    #[must_use]
    pub const fn result_high_low_detection(self) -> bool {
        self.0 & 0x0020 != 0
    }

    /// Sensor temperature high-low detection supported
    #[must_use]
    pub const fn temperature_high_low_detection(self) -> bool {
        self.0 & 0x0040 != 0
    }

    /// Sensor read interrupt detection supported
    #[must_use]
    pub const fn read_interrupt_detection(self) -> bool {
        self.0 & 0x0080 != 0
    }

    /// General device fault supported
    #[must_use]
    pub const fn general_device_fault(self) -> bool {
        self.0 & 0x0100 != 0
    }

    /// Time fault supported
    #[must_use]
    pub const fn time_fault(self) -> bool {
        self.0 & 0x0200 != 0
    }

    /// Multiple bond supported
    #[must_use]
    pub const fn multiple_bond(self) -> bool {
        self.0 & 0x0400 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_measurement() {
        let data = [0x00, 0x2A, 0x00, 0xE4, 0x07, 0x05, 0x15, 0x0A, 0x1E, 0x2D];
        let record = GlucoseMeasurement::parse(&data).unwrap();

        assert_eq!(record.sequence_number, 42);
        assert_eq!(record.base_time.to_string(), "2020-05-21 10:30:45");
        assert_eq!(record.time_offset, None);
        assert_eq!(record.concentration, None);
        assert_eq!(record.status, None);
        assert!(!record.context_follows);
    }

    #[test]
    fn test_full_measurement() {
        let data = [
            0x1B, // offset, concentration (kg/L), status, context follows
            0x07, 0x00, // seq 7
            0xE4, 0x07, 0x01, 0x01, 0x08, 0x00, 0x00, // 2020-01-01 08:00:00
            0xF6, 0xFF, // offset -10 min
            0x5A, 0xB0, // 90e-5 kg/L
            0x11, // capillary whole blood, finger
            0x01, 0x04, // battery low, general fault
        ];
        let record = GlucoseMeasurement::parse(&data).unwrap();

        assert_eq!(record.sequence_number, 7);
        assert_eq!(record.time_offset, Some(-10));
        assert!(record.context_follows);

        let concentration = record.concentration.unwrap();
        assert_eq!(concentration.unit, ConcentrationUnit::KgPerL);
        assert_eq!(concentration.sample_type, SampleType::CapillaryWholeBlood);
        assert_eq!(concentration.sample_location, SampleLocation::Finger);
        assert!((concentration.mg_per_dl().unwrap() - 90.0).abs() < 0.01);
        assert_eq!(concentration.mmol_per_l(), None);

        let status = record.status.unwrap();
        assert!(status.device_battery_low());
        assert!(status.general_device_fault());
        assert!(!status.time_fault());
    }

    #[test]
    fn test_mol_per_litre_unit() {
        let data = [
            0x06, 0x01, 0x00, 0xE4, 0x07, 0x01, 0x01, 0x08, 0x00, 0x00, 0x37, 0xC0, 0x2F,
        ];
        let concentration = GlucoseMeasurement::parse(&data)
            .unwrap()
            .concentration
            .unwrap();

        assert_eq!(concentration.unit, ConcentrationUnit::MolPerL);
        // 55e-4 mol/L
        assert!((concentration.mmol_per_l().unwrap() - 5.5).abs() < 0.001);
        assert_eq!(concentration.sample_location, SampleLocation::AlternateSiteTest);
        assert_eq!(concentration.sample_type, SampleType::Unknown(15));
    }

    #[test]
    fn test_truncated_measurement_rejected() {
        assert!(GlucoseMeasurement::parse(&[0x00, 0x2A, 0x00, 0xE4, 0x07, 0x05, 0x15]).is_err());
        // concentration flagged but missing the type/location byte
        let data = [
            0x02, 0x01, 0x00, 0xE4, 0x07, 0x01, 0x01, 0x08, 0x00, 0x00, 0x37, 0xD0,
        ];
        assert!(GlucoseMeasurement::parse(&data).unwrap_err().is_length_error());
    }

    #[test]
    fn test_big_endian_measurement() {
        let data = [
            0x0B, // offset, concentration (kg/L), status
            0x01, 0x00, // seq 256
            0x07, 0xE4, 0x01, 0x01, 0x08, 0x00, 0x00, // 2020-01-01 08:00:00
            0xFF, 0xF6, // offset -10 min
            0xB0, 0x5A, // 90e-5 kg/L
            0x11, // capillary whole blood, finger
            0x04, 0x01, // battery low, general fault
        ];
        let record = GlucoseMeasurement::parse_with_order(&data, ByteOrder::BigEndian).unwrap();

        assert_eq!(record.sequence_number, 256);
        assert_eq!(record.base_time.year, Some(2020));
        assert_eq!(record.time_offset, Some(-10));
        assert!((record.concentration.unwrap().mg_per_dl().unwrap() - 90.0).abs() < 0.01);
        assert_eq!(record.status, Some(GlucoseStatus(0x0401)));
    }

    #[test]
    fn test_full_context() {
        let data = [
            0xFF, // every field, medication in litres
            0x07, 0x00, // seq 7
            0x00, // extended flags
            0x01, 0x32, 0xD0, // breakfast, 50e-3 kg
            0x02, // postprandial
            0x21, // self, major health issues
            0x10, 0x0E, 0x50, // 3600 s at 80 %
            0x01, 0x0A, 0xA0, // rapid acting insulin, 10e-6 L
            0x41, 0xF0, // HbA1c 6.5 %
        ];
        let context = GlucoseContext::parse(&data).unwrap();

        assert_eq!(context.sequence_number, 7);
        assert_eq!(context.extended_flags, Some(0));

        let carbohydrate = context.carbohydrate.unwrap();
        assert_eq!(carbohydrate.kind, Carbohydrate::Breakfast);
        assert!((carbohydrate.amount_kg - 0.05).abs() < 1e-6);

        assert_eq!(context.meal, Some(Meal::Postprandial));
        assert_eq!(context.tester, Some(Tester::SelfTest));
        assert_eq!(context.health, Some(Health::MajorIssues));
        assert_eq!(
            context.exercise,
            Some(Exercise {
                duration: 3600,
                intensity: 80
            })
        );

        let medication = context.medication.unwrap();
        assert_eq!(medication.kind, Medication::RapidActingInsulin);
        assert_eq!(medication.unit, MedicationUnit::Liters);
        assert!((medication.amount - 10e-6).abs() < 1e-9);

        assert!((context.hba1c.unwrap() - 6.5).abs() < 0.001);
    }

    #[test]
    fn test_context_unknown_codes_are_kept() {
        let context = GlucoseContext::parse(&[0x06, 0x01, 0x00, 0x09, 0xFF]).unwrap();

        assert_eq!(context.meal, Some(Meal::Unknown(9)));
        assert_eq!(context.tester, Some(Tester::NotAvailable));
        assert_eq!(context.health, Some(Health::NotAvailable));
        assert_eq!(context.carbohydrate, None);
        assert_eq!(Meal::Unknown(9).to_string(), "Unknown (9)");
    }

    #[test]
    fn test_truncated_context_rejected() {
        assert!(GlucoseContext::parse(&[0x00, 0x01]).is_err());
        assert!(GlucoseContext::parse(&[0x40, 0x01, 0x00, 0x41]).is_err());
        assert!(GlucoseContext::parse(&[0x80, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_feature_bits() {
        let feature = GlucoseFeature::parse(&[0x03, 0x04]).unwrap();

        assert!(feature.low_battery_detection());
        assert!(feature.sensor_malfunction_detection());
        assert!(!feature.sensor_sample_size());
        assert!(feature.multiple_bond());
        assert_eq!(
            GlucoseFeature::parse_with_order(&[0x04, 0x03], ByteOrder::BigEndian),
            Ok(feature)
        );
        assert_eq!(
            GlucoseFeature::parse(&[0x03]),
            Err(crate::DecodeError::InsufficientData {
                required: 2,
                actual: 1
            })
        );
    }
}
