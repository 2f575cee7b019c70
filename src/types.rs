////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Resource type identifiers found in The Sims 2 packages

/// Generic data, UI layout scripts in `ui.package`
pub const UI_DATA: u32 = 0x0000_0000;

/// PNG, JPEG or TGA image
pub const IMAGE: u32 = 0x856D_DBAC;

/// Accelerator key definitions
pub const ACCEL_DEF: u32 = 0xA2E3_D533;

/// Directory of compressed files. Lists every compressed entry of a package
/// with its decompressed size.
pub const DIRECTORY: u32 = 0xE86B_1EEF;

/// Human readable name of a type identifier, if it is a known one
#[must_use]
pub fn type_name(type_id: u32) -> Option<&'static str> {
    let name = match type_id {
        UI_DATA => "UI Data",
        IMAGE => "Image File",
        ACCEL_DEF => "Accelerator Key Definitions",
        DIRECTORY => "Directory of Compressed Files",
        0x0A28_4D0B => "Wall Graph",
        0x0BF9_99E7 => "Lot or Tutorial Description",
        0x0C7E_9A76 => "JPEG/JFIF Image",
        0x0C90_0FDB => "Pool Surface",
        0x1C4A_276C => "Texture",
        0x2026_960B => "MP3 Audio / SPX Speech / XA Audio",
        0x2523_2B11 => "Scene Node",
        0x2A51_171B => "3D Array",
        0x2C1F_D8A1 => "Texture Overlay XML",
        0x4243_4F4E => "Behaviour Constant",
        0x4248_4156 => "Behaviour Function",
        0x424D_505F => "Bitmap(s)",
        0x4341_5453 => "Catalog String",
        0x4349_4745 => "Image Link",
        0x4354_5353 => "Catalog Description",
        0x4447_5250 => "Drawgroup",
        0x4641_4345 => "Face Properties",
        0x4641_4D49 => "Family Information",
        0x4641_4D68 => "Family Data",
        0x4643_4E53 => "Global Tuning Values",
        0x4657_4156 => "Audio Reference",
        0x474C_4F42 => "Global Data",
        0x484F_5553 => "House Data",
        0x4959_6978 => "Material Definitions",
        0x49FF_7D76 => "World Database",
        0x4B58_975B => "Lot or Terrain Texture Map",
        0x4C69_7E5A => "Material Override",
        0x4D51_F042 => "Cinematic Scenes",
        0x4D53_3EDD => "JPEG/JFIF Image",
        0x4E47_4248 => "Neighborhood Data",
        0x4E52_4546 => "Name Reference",
        0x4E6D_6150 => "Name Map",
        0x4F42_4A44 => "Object Data",
        0x4F42_4A66 => "Object Functions",
        0x4F62_6A4D => "Object Metadata",
        0x5041_4C54 => "Image Color Palette",
        0x5045_5253 => "Person Status",
        0x504F_5349 => "Edith Positional Information (deprecated)",
        0x5054_4250 => "Package Toolkit",
        0x5349_4D49 => "Sim Information",
        0x534C_4F54 => "Object Slot",
        0x5350_5232 => "Sprites",
        0x5354_5223 => "Text String",
        0x5441_5454 => "Tree Attributes",
        0x5450_5250 => "Edith SimAntics Behavior Labels",
        0x5452_434E => "Behavior Constant Labels",
        0x5452_4545 => "Tree Data",
        0x5454_4142 => "Pie Menu Functions",
        0x5454_4173 => "Pie Menu Strings",
        0x584D_544F => "Material Object Class Dump",
        0x584F_424A => "Object Class Dump",
        0x6A97_042F => "Lighting (Environment Cube Light)",
        0x6B94_3B43 => "2D Array",
        0x6C58_9723 => "Lot Definition",
        0x6F62_6A74 => "Main Lot Objects",
        0x7B1A_CFCD => "Hitlist (TS2 format)",
        0x7BA3_838C => "Geometric Node",
        0x8A84_D7B0 => "Wall Layer",
        0x8C15_80B5 => "Hairtone XML",
        0x8C3C_E95A => "JPEG/JFIF Image",
        0x8C87_0743 => "Family Ties",
        0x8CC0_A14B => "Predictive Map",
        0x8DB5_E4C2 => "Sound Effects",
        0xAACE_2EFB => "Person Data (Formerly SDSC/SINF/SDAT)",
        0xAB4B_A572 => "Fence Post Layer",
        0xAB94_06AA => "Roof",
        0xABCB_5DA4 => "Neighbourhood Terrain Geometry",
        0xABD0_DC63 => "Neighborhood Terrain",
        0xAC06_A66F => "Lighting (Linear Fog Light)",
        0xAC06_A676 => "Lighting (Draw State Light)",
        0xAC4F_8687 => "Geometric Data Container",
        0xAC50_6764 => "Sim Outfits",
        0xAC8A_7A2E => "Neighbourhood ID",
        0xACE4_6235 => "Surface Texture",
        0xB21B_E28B => "Weather Info",
        0xBA35_3CE1 => "The Sims SG System",
        0xC9C8_1B9B => "Lighting (Ambient Light)",
        0xC9C8_1BA3 => "Lighting (Directional Light)",
        0xC9C8_1BA9 => "Lighting (Point Light)",
        0xC9C8_1BAD => "Lighting (Spot Light)",
        0xCAC4_FC40 => "String Map",
        0xCB43_87A1 => "Vertex Layer",
        0xCC36_4C2A => "Sim Relations",
        0xCCCE_F852 => "Facial Structure",
        0xCD7F_E87A => "Maxis Material Shader",
        0xCD95_548E => "Wants and Fears",
        0xCDB4_67B8 => "Content Registry",
        0xE519_C933 => "Resource Node",
        0xEA51_18B0 => "Effects Resource Tree",
        0xEBCF_3E27 => "Property Set",
        0xEC44_BDDC => "Neighborhood View",
        0xED53_4136 => "Level Information",
        0xFA1C_39F7 => "Singular Lot Object",
        0xFB00_791E => "Animation Resource",
        0xFC6E_B1F7 => "Shape",
        _ => return None,
    };
    Some(name)
}

/// Like [type_name], falling back to `Unknown (0x...)`
#[must_use]
pub fn describe(type_id: u32) -> String {
    type_name(type_id).map_or_else(|| format!("Unknown ({type_id:#x})"), str::to_owned)
}
