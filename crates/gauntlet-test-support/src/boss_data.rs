//! Sample boss table.

/// A boss data document with a complete `pcr_jp` table of five bosses per
/// round and a second, partial region.
pub const SAMPLE_BOSS_DATA: &str = r"
pcr_jp:
  boss_hp:
    A: [6000000, 8000000, 10000000, 12000000, 15000000]
    B: [8000000, 10000000, 13000000, 15000000, 20000000]
    C: [20000000, 22000000, 25000000, 28000000, 30000000]
    D: [120000000, 125000000, 130000000, 140000000, 150000000]
pcr_small:
  boss_hp:
    A: [100, 200]
";
